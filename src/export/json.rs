//! JSON sidecar exporter.
//!
//! Buffers the whole batch and writes once: `{source_root, output_text,
//! messages}` with one flattened record per message, pretty-printed.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, VaultError};
use crate::export::record::MessageRecord;
use crate::model::Message;

#[derive(Serialize)]
struct Sidecar<'a> {
    source_root: &'a str,
    output_text: String,
    messages: Vec<MessageRecord>,
}

/// Write the JSON sidecar for `messages`.
///
/// `output_text` names the text artifact this sidecar accompanies;
/// empty when exported standalone.
pub fn export_json(
    messages: &[Message],
    dest: &Path,
    source_root: &str,
    output_text: Option<&Path>,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| VaultError::output(dest, e))?;
        }
    }

    let payload = Sidecar {
        source_root,
        output_text: output_text
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        messages: messages.iter().map(MessageRecord::from_message).collect(),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    fs::write(dest, json).map_err(|e| VaultError::output(dest, e))
}
