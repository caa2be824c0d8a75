//! Canonical message, attachment and body-part types.
//!
//! Every source format (MSG, EML, PST-extracted) is normalized into these
//! value types by exactly one adapter invocation per input file. Messages
//! are immutable after construction: adapters build them, exporters read
//! them, nothing mutates them in between.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Placeholder body used whenever neither a plain-text nor an HTML body
/// can be extracted. `body_text` is never the empty string.
pub const NO_BODY_PLACEHOLDER: &str = "(No Body Extracted)";

/// A content hash together with the algorithm that produced it.
///
/// Always computed over raw bytes (source file or decoded payload),
/// prior to any re-encoding.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HashInfo {
    /// Hash algorithm name, e.g. `"sha256"`.
    pub algorithm: String,

    /// Lowercase hex digest.
    pub value: String,
}

impl HashInfo {
    /// A SHA-256 digest.
    pub fn sha256(value: impl Into<String>) -> Self {
        Self {
            algorithm: "sha256".to_string(),
            value: value.into(),
        }
    }
}

/// A single attachment extracted from a message.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Unique within the owning message: `"<message id>-att<n>"`, 1-based.
    pub id: String,

    /// Attachment filename; `"attachment"` when the source carries none.
    pub filename: String,

    /// Decoded payload size in bytes, when the payload was recoverable.
    pub size: Option<u64>,

    /// MIME content type (e.g. `"application/pdf"`), if declared.
    pub content_type: Option<String>,

    /// SHA-256 of the decoded payload bytes, never the encoded wire form.
    pub sha256: Option<String>,

    /// Decoded payload bytes. Skipped during serialization; the flattened
    /// export records carry only metadata and hashes.
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
}

/// One MIME part captured verbatim when richer multi-part detail is
/// wanted. Default canonicalization resolves everything into a single
/// `body_text` and at most one of these.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BodyPart {
    /// MIME content type of the part.
    pub content_type: String,

    /// Decoded textual content.
    pub content: String,

    /// Declared charset, if any.
    pub charset: Option<String>,
}

/// A fully normalized email message.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Derived from the `Message-ID` header when present, otherwise the
    /// source filename stem. Unique within a batch after disambiguation.
    pub id: String,

    /// Original locator string. For archive members this encodes the
    /// container relationship: `"<archive path> :: <extracted path>"`.
    pub source: String,

    /// Filesystem path of the file this message was adapted from.
    pub source_path: Option<PathBuf>,

    /// Decoded subject line; empty when the source has none.
    pub subject: String,

    /// Sender display string, e.g. `"Jane Doe <jane@example.com>"`.
    pub sender: String,

    /// Primary recipients, in source order.
    pub to: Vec<String>,

    /// Carbon-copy recipients, in source order.
    pub cc: Vec<String>,

    /// Blind-copy recipients, in source order.
    pub bcc: Vec<String>,

    /// Parsed send timestamp, UTC-normalized. `None` when no recognized
    /// format parses; that is not an error.
    pub sent_at: Option<DateTime<Utc>>,

    /// Resolved plain-text body. Never empty: a fixed placeholder is
    /// substituted when nothing is extractable.
    pub body_text: String,

    /// Original HTML body, when the source had one.
    pub body_html: Option<String>,

    /// Captured MIME parts, when richer detail was available.
    pub body_parts: Vec<BodyPart>,

    /// Attachments in source order.
    pub attachments: Vec<Attachment>,

    /// Raw header map (first occurrence wins for duplicate keys).
    pub headers: std::collections::BTreeMap<String, String>,

    /// Content hashes of the source bytes (currently one SHA-256 entry).
    pub hashes: Vec<HashInfo>,
}

impl Message {
    /// The SHA-256 of the source file's raw bytes, when recorded.
    pub fn source_sha256(&self) -> Option<&str> {
        self.hashes
            .iter()
            .find(|h| h.algorithm == "sha256")
            .map(|h| h.value.as_str())
    }

    /// The message's own file name: the member component for archive
    /// members, otherwise the final component of `source_path`, falling
    /// back to the id.
    pub fn file_name(&self) -> String {
        if let Some((_, member)) = self.source.split_once(" :: ") {
            if let Some(name) = Path::new(member.trim()).file_name() {
                return name.to_string_lossy().into_owned();
            }
        }
        self.source_path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message {
            id: "<abc@example.com>".to_string(),
            source: "/mail/a.eml".to_string(),
            source_path: Some(PathBuf::from("/mail/a.eml")),
            subject: "Hello".to_string(),
            sender: "Jane <jane@example.com>".to_string(),
            to: vec!["bob@example.com".to_string()],
            cc: Vec::new(),
            bcc: Vec::new(),
            sent_at: None,
            body_text: "Hi".to_string(),
            body_html: None,
            body_parts: Vec::new(),
            attachments: Vec::new(),
            headers: Default::default(),
            hashes: vec![HashInfo::sha256("deadbeef")],
        }
    }

    #[test]
    fn test_source_sha256_lookup() {
        assert_eq!(sample().source_sha256(), Some("deadbeef"));
    }

    #[test]
    fn test_file_name_from_path() {
        assert_eq!(sample().file_name(), "a.eml");
    }

    #[test]
    fn test_file_name_falls_back_to_id() {
        let mut m = sample();
        m.source_path = None;
        assert_eq!(m.file_name(), "<abc@example.com>");
    }

    #[test]
    fn test_file_name_of_archive_member() {
        let mut m = sample();
        m.source = "/mail/old.pst :: Inbox/0001.eml".to_string();
        m.source_path = Some(PathBuf::from("/mail/old.pst"));
        assert_eq!(m.file_name(), "0001.eml");
    }
}
