//! Flattened message records.
//!
//! The stable primitive-field view of a message shared by the text
//! artifact, the JSON sidecar, and RPC payloads. Address lists are
//! joined into single comma-separated strings and the timestamp becomes
//! an ISO-8601 string (empty when unparsed), so downstream consumers
//! never see model types.

use serde::{Deserialize, Serialize};

use crate::model::Message;

/// Attachment entry inside a flattened record. Only metadata and the
/// payload hash are carried, never the payload itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub filename: String,
    pub size: Option<u64>,
    pub sha256: Option<String>,
    pub content_type: Option<String>,
}

/// One message flattened to primitives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// The message's own file name (archive members report the member).
    pub file: String,

    /// Original locator, `"<archive> :: <member>"` for archive members.
    pub source: String,

    /// ISO-8601 timestamp, empty when no recognized format parsed.
    pub date: String,

    #[serde(rename = "from")]
    pub sender: String,

    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub message_id: String,
    pub body: String,
    pub body_html: Option<String>,
    pub attachments: Vec<AttachmentRecord>,

    /// SHA-256 of the source file's raw bytes.
    pub source_sha256: Option<String>,
}

impl MessageRecord {
    pub fn from_message(message: &Message) -> Self {
        Self {
            file: message.file_name(),
            source: message.source.clone(),
            date: message
                .sent_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            sender: message.sender.clone(),
            to: message.to.join(", "),
            cc: message.cc.join(", "),
            bcc: message.bcc.join(", "),
            subject: message.subject.clone(),
            message_id: message.id.clone(),
            body: message.body_text.clone(),
            body_html: message.body_html.clone(),
            attachments: message
                .attachments
                .iter()
                .map(|a| AttachmentRecord {
                    filename: a.filename.clone(),
                    size: a.size,
                    sha256: a.sha256.clone(),
                    content_type: a.content_type.clone(),
                })
                .collect(),
            source_sha256: message.source_sha256().map(str::to_string),
        }
    }
}
