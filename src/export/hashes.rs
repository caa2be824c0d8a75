//! Hash manifest exporter.
//!
//! One CSV row per successfully processed message plus one per
//! attachment, linking every artifact record back to its source bytes.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{Result, VaultError};
use crate::model::Message;

/// Export the hash manifest for `messages`.
///
/// Columns: type, parent_source, filename, size, sha256. Message rows
/// carry an empty size; attachment rows point at the owning message's
/// source.
pub fn export_hashes(messages: &[Message], dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| VaultError::output(dest, e))?;
        }
    }
    let mut file = File::create(dest).map_err(|e| VaultError::output(dest, e))?;

    writeln!(file, "type,parent_source,filename,size,sha256")
        .map_err(|e| VaultError::output(dest, e))?;

    for message in messages {
        let sha256 = message.source_sha256().unwrap_or("");
        writeln!(
            file,
            "message,{},{},,{}",
            csv_escape(&message.source),
            csv_escape(&message.file_name()),
            csv_escape(sha256),
        )
        .map_err(|e| VaultError::output(dest, e))?;

        for att in &message.attachments {
            let size = att.size.map(|n| n.to_string()).unwrap_or_default();
            writeln!(
                file,
                "attachment,{},{},{},{}",
                csv_escape(&message.source),
                csv_escape(&att.filename),
                size,
                csv_escape(att.sha256.as_deref().unwrap_or("")),
            )
            .map_err(|e| VaultError::output(dest, e))?;
        }
    }

    Ok(())
}

/// Escape a value for CSV (RFC 4180).
///
/// Wraps in double quotes if the value contains commas, quotes, or newlines.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attachment, HashInfo};

    fn sample(attachment_count: usize) -> Message {
        let attachments = (1..=attachment_count)
            .map(|n| Attachment {
                id: format!("m1-att{n}"),
                filename: format!("file{n}.bin"),
                size: Some(100 * n as u64),
                content_type: None,
                sha256: Some(format!("{n:02x}")),
                payload: None,
            })
            .collect();
        Message {
            id: "m1".to_string(),
            source: "/mail/a.eml".to_string(),
            source_path: Some("/mail/a.eml".into()),
            subject: String::new(),
            sender: String::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            sent_at: None,
            body_text: "x".to_string(),
            body_html: None,
            body_parts: Vec::new(),
            attachments,
            headers: Default::default(),
            hashes: vec![HashInfo::sha256("aa")],
        }
    }

    #[test]
    fn test_row_count_is_messages_plus_attachments() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("hashes.csv");

        export_hashes(&[sample(2), sample(0)], &dest).unwrap();

        let content = std::fs::read_to_string(&dest).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "type,parent_source,filename,size,sha256");
        assert_eq!(lines.len(), 1 + 2 + 2);
    }

    #[test]
    fn test_message_row_has_empty_size() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("hashes.csv");

        export_hashes(&[sample(1)], &dest).unwrap();

        let content = std::fs::read_to_string(&dest).unwrap();
        assert!(content.contains("message,/mail/a.eml,a.eml,,aa"));
        assert!(content.contains("attachment,/mail/a.eml,file1.bin,100,01"));
    }

    #[test]
    fn test_csv_escape_simple() {
        assert_eq!(csv_escape("hello"), "hello");
    }

    #[test]
    fn test_csv_escape_comma() {
        assert_eq!(csv_escape("hello, world"), "\"hello, world\"");
    }

    #[test]
    fn test_csv_escape_quotes() {
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_escaped_filename_row() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("hashes.csv");

        let mut message = sample(1);
        message.attachments[0].filename = "totals, final.xlsx".to_string();
        export_hashes(&[message], &dest).unwrap();

        let content = std::fs::read_to_string(&dest).unwrap();
        assert!(content.contains("\"totals, final.xlsx\""));
    }
}
