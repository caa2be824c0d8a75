//! Adapter for the proprietary compound-binary message format (`.msg`),
//! built on the `msg_parser` crate.
//!
//! `msg_parser` exposes attachment payloads as hex strings; they are
//! decoded here so size and hash cover the actual bytes. A payload that
//! is not valid hex is kept verbatim (observed parser behavior for some
//! OLE property types, not documented).

use std::path::Path;

use msg_parser::Outlook;

use crate::error::{Result, VaultError};
use crate::hash::sha256_file;
use crate::model::Message;

use super::record::{self, split_addresses, RawAttachment, RawMessage};

/// Load one `.msg` file into a canonical message.
pub fn load_message(path: &Path) -> Result<Message> {
    Ok(record::into_message(extract(path)?))
}

/// Extract a typed raw record from a compound-binary message file.
pub fn extract(path: &Path) -> Result<RawMessage> {
    if !path.is_file() {
        return Err(VaultError::NotFound(path.to_path_buf()));
    }

    let outlook = Outlook::from_path(path).map_err(|e| VaultError::extraction(path, e))?;
    let source_sha256 = sha256_file(path)?;

    let mut headers = std::collections::BTreeMap::new();
    for (name, value) in [
        ("Date", &outlook.headers.date),
        ("Message-ID", &outlook.headers.message_id),
        ("Content-Type", &outlook.headers.content_type),
        ("Reply-To", &outlook.headers.reply_to),
    ] {
        if !value.is_empty() {
            headers.insert(name.to_string(), value.clone());
        }
    }

    let attachments = outlook
        .attachments
        .iter()
        .map(|att| {
            // The format stores several name fields; keep the longest one
            let filename = longest_name(&att.file_name, &att.display_name);
            let payload = if att.payload.is_empty() {
                None
            } else {
                Some(decode_hex_payload(&att.payload))
            };
            RawAttachment {
                filename,
                content_type: if att.mime_tag.is_empty() {
                    None
                } else {
                    Some(att.mime_tag.clone())
                },
                payload,
            }
        })
        .collect();

    Ok(RawMessage {
        source_path: path.to_path_buf(),
        source: path.to_string_lossy().into_owned(),
        message_id: non_empty(&outlook.headers.message_id),
        subject: outlook.subject.clone(),
        sender: format_person(&outlook.sender.name, &outlook.sender.email),
        to: outlook
            .to
            .iter()
            .map(|p| format_person(&p.name, &p.email))
            .collect(),
        cc: outlook
            .cc
            .iter()
            .map(|p| format_person(&p.name, &p.email))
            .collect(),
        bcc: split_addresses(&outlook.bcc),
        date: non_empty(&outlook.headers.date),
        body: non_empty(&outlook.body),
        body_html: None,
        headers,
        attachments,
        source_sha256: Some(source_sha256),
    })
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn format_person(name: &str, email: &str) -> String {
    match (name.is_empty(), email.is_empty()) {
        (false, false) => format!("{name} <{email}>"),
        (false, true) => name.to_string(),
        (true, false) => email.to_string(),
        (true, true) => String::new(),
    }
}

fn longest_name(file_name: &str, display_name: &str) -> String {
    if display_name.len() > file_name.len() {
        display_name.to_string()
    } else {
        file_name.to_string()
    }
}

/// Decode a hex payload string; non-hex input falls back to raw bytes.
fn decode_hex_payload(payload: &str) -> Vec<u8> {
    match decode_hex(payload) {
        Some(bytes) => bytes,
        None => payload.as_bytes().to_vec(),
    }
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    let compact: Vec<u8> = s
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if compact.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(compact.len() / 2);
    let mut i = 0;
    while i < compact.len() {
        let hi = hex_val(compact[i])?;
        let lo = hex_val(compact[i + 1])?;
        out.push((hi << 4) | lo);
        i += 2;
    }
    Some(out)
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_payload() {
        // "255044462d312e35" is "%PDF-1.5"
        assert_eq!(decode_hex_payload("255044462d312e35"), b"%PDF-1.5");
    }

    #[test]
    fn test_decode_hex_uppercase_and_whitespace() {
        assert_eq!(decode_hex_payload("48 45 4C 4C 4F"), b"HELLO");
    }

    #[test]
    fn test_non_hex_payload_kept_verbatim() {
        assert_eq!(decode_hex_payload("not-hex!"), b"not-hex!");
    }

    #[test]
    fn test_longest_name_field_wins() {
        assert_eq!(longest_name("a.txt", "annual-report.txt"), "annual-report.txt");
        assert_eq!(longest_name("report-final.pdf", "r.pdf"), "report-final.pdf");
        assert_eq!(longest_name("", "note.txt"), "note.txt");
    }

    #[test]
    fn test_format_person() {
        assert_eq!(format_person("Jane", "j@x.com"), "Jane <j@x.com>");
        assert_eq!(format_person("", "j@x.com"), "j@x.com");
        assert_eq!(format_person("Jane", ""), "Jane");
        assert_eq!(format_person("", ""), "");
    }

    #[test]
    fn test_corrupt_file_is_extraction_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.msg");
        std::fs::write(&path, b"this is not an OLE compound file").unwrap();
        let err = extract(&path).unwrap_err();
        assert!(matches!(err, VaultError::Extraction { .. }));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = extract(Path::new("/nonexistent/m.msg")).unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }
}
