//! RFC822/MIME adapter built on `mail-parser`.
//!
//! Body selection order: first non-attachment `text/plain` part in
//! document order, then the first non-attachment `text/html` part
//! (converted to text during mapping), then the placeholder. Attachment
//! payloads come out of `mail-parser` already decoded, so size and hash
//! reflect the real bytes, not the wire encoding.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use mail_parser::{MessageParser, MimeHeaders, PartType};

use crate::error::{Result, VaultError};
use crate::hash::sha256_hex;
use crate::model::Message;

use super::record::{self, RawAttachment, RawMessage};

/// Load one `.eml` file into a canonical message.
pub fn load_message(path: &Path) -> Result<Message> {
    let data = fs::read(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            VaultError::NotFound(path.to_path_buf())
        } else {
            VaultError::io(path, e)
        }
    })?;
    Ok(record::into_message(extract(path, &data)?))
}

/// Extract a typed raw record from RFC822 bytes.
pub fn extract(path: &Path, data: &[u8]) -> Result<RawMessage> {
    let parsed = MessageParser::default()
        .parse(data)
        .ok_or_else(|| VaultError::extraction(path, "not a parseable RFC822 message"))?;

    let headers = raw_header_map(data);

    let message_id = header_value(&headers, "message-id")
        .map(extract_angle_bracket)
        .or_else(|| parsed.message_id().map(ensure_angle_brackets));

    let date = header_value(&headers, "date")
        .map(String::from)
        .or_else(|| parsed.date().map(|d| d.to_rfc3339()));

    let sender = parsed
        .from()
        .and_then(|a| a.first())
        .map(format_address)
        .unwrap_or_default();

    let mut attachments = Vec::new();
    for part in parsed.attachments() {
        let declared_attachment = part
            .content_disposition()
            .map(|d| d.ctype().eq_ignore_ascii_case("attachment"))
            .unwrap_or(false);
        if !declared_attachment {
            continue;
        }
        attachments.push(RawAttachment {
            filename: part.attachment_name().unwrap_or("attachment").to_string(),
            content_type: part.content_type().map(format_content_type),
            payload: Some(part.contents().to_vec()),
        });
    }

    Ok(RawMessage {
        source_path: path.to_path_buf(),
        source: path.to_string_lossy().into_owned(),
        message_id,
        subject: parsed.subject().unwrap_or_default().to_string(),
        sender,
        to: address_list(parsed.to()),
        cc: address_list(parsed.cc()),
        bcc: address_list(parsed.bcc()),
        date,
        body: first_text_part(&parsed),
        body_html: first_html_part(&parsed),
        headers,
        attachments,
        source_sha256: Some(sha256_hex(data)),
    })
}

/// First genuine `text/plain` body part. `mail-parser` also lists HTML
/// parts as text-body candidates (converting on access); those are
/// skipped here so HTML handling stays in one place downstream.
fn first_text_part(parsed: &mail_parser::Message<'_>) -> Option<String> {
    parsed
        .text_body
        .iter()
        .find_map(|id| match &parsed.parts.get(*id)?.body {
            PartType::Text(text) => Some(text.as_ref().to_string()),
            _ => None,
        })
}

/// First genuine `text/html` body part, unconverted.
fn first_html_part(parsed: &mail_parser::Message<'_>) -> Option<String> {
    parsed
        .html_body
        .iter()
        .find_map(|id| match &parsed.parts.get(*id)?.body {
            PartType::Html(html) => Some(html.as_ref().to_string()),
            _ => None,
        })
}

fn address_list(addresses: Option<&mail_parser::Address<'_>>) -> Vec<String> {
    addresses
        .map(|a| a.iter().map(format_address).collect())
        .unwrap_or_default()
}

fn format_address(addr: &mail_parser::Addr<'_>) -> String {
    match (addr.name(), addr.address()) {
        (Some(name), Some(address)) => format!("{name} <{address}>"),
        (Some(name), None) => name.to_string(),
        (None, address) => address.unwrap_or("").to_string(),
    }
}

fn format_content_type(ct: &mail_parser::ContentType<'_>) -> String {
    let main = ct.ctype();
    match ct.subtype() {
        Some(sub) => format!("{main}/{sub}"),
        None => main.to_string(),
    }
}

/// Capture the raw header block as an unfolded key → value map.
/// First occurrence wins for duplicate names (`Received` chains keep
/// only their first hop).
fn raw_header_map(data: &[u8]) -> BTreeMap<String, String> {
    let end = find_header_end(data).unwrap_or(data.len());
    let text = String::from_utf8_lossy(&data[..end]);

    let mut map: BTreeMap<String, String> = BTreeMap::new();
    let mut last_key: Option<String> = None;
    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            // Continuation line
            if let Some(key) = &last_key {
                if let Some(value) = map.get_mut(key) {
                    value.push(' ');
                    value.push_str(line.trim());
                }
            }
        } else if let Some(colon) = line.find(':') {
            let name = line[..colon].trim().to_string();
            let value = line[colon + 1..].trim().to_string();
            if map.contains_key(&name) {
                last_key = None;
            } else {
                map.insert(name.clone(), value);
                last_key = Some(name);
            }
        }
    }
    map
}

/// Find the byte offset where headers end (position of the first blank line).
fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}

fn header_value<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Keep `<…>` content including the brackets (Message-ID convention).
fn extract_angle_bracket(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(start) = trimmed.find('<') {
        if let Some(end) = trimmed[start..].find('>') {
            return trimmed[start..start + end + 1].to_string();
        }
    }
    trimmed.to_string()
}

fn ensure_angle_brackets(id: &str) -> String {
    if id.starts_with('<') {
        id.to_string()
    } else {
        format!("<{id}>")
    }
}
