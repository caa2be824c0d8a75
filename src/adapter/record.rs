//! Typed intermediate records bridging format adapters to the canonical model.
//!
//! Each adapter fills a [`RawMessage`] with whatever its source format
//! exposes; [`into_message`] is the single pure mapping into the canonical
//! [`Message`]. Format quirks (hex payloads, header folding, recipient
//! strings) stay on the adapter side of this boundary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::hash::sha256_hex;
use crate::model::{Attachment, BodyPart, HashInfo, Message, NO_BODY_PLACEHOLDER};

use super::html::html_to_text;

/// Extraction result for one source message, before canonicalization.
#[derive(Debug, Clone, Default)]
pub struct RawMessage {
    /// Path of the file this was extracted from.
    pub source_path: PathBuf,

    /// Locator string recorded on the canonical message. The Pst adapter
    /// rewrites this to `"<archive> :: <member>"`.
    pub source: String,

    /// `Message-ID` header value, brackets included, when present.
    pub message_id: Option<String>,

    pub subject: String,
    pub sender: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,

    /// Raw date text as the source carried it; parsed during mapping.
    pub date: Option<String>,

    /// Plain-text body, if the source had one.
    pub body: Option<String>,

    /// HTML body, if the source had one.
    pub body_html: Option<String>,

    /// Unfolded raw headers, first occurrence wins.
    pub headers: BTreeMap<String, String>,

    pub attachments: Vec<RawAttachment>,

    /// SHA-256 of the source file's raw bytes.
    pub source_sha256: Option<String>,
}

/// One attachment as extracted, payload already decoded.
#[derive(Debug, Clone, Default)]
pub struct RawAttachment {
    pub filename: String,
    pub content_type: Option<String>,

    /// Decoded payload bytes; `None` when the source did not yield them.
    pub payload: Option<Vec<u8>>,
}

/// Map a raw extraction into a canonical [`Message`]. Pure and infallible:
/// anything unparseable degrades to `None`/placeholder fields.
pub fn into_message(raw: RawMessage) -> Message {
    let id = raw
        .message_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| file_stem(&raw.source_path, &raw.source));

    let sent_at = raw.date.as_deref().and_then(parse_timestamp);

    let body = raw
        .body
        .as_deref()
        .map(clean_text)
        .filter(|s| !s.is_empty());
    let body_from_html = || {
        raw.body_html
            .as_deref()
            .map(|h| clean_text(&html_to_text(h)))
            .filter(|s| !s.is_empty())
    };
    let resolved = body.or_else(body_from_html);

    let body_parts = resolved
        .as_ref()
        .map(|content| {
            vec![BodyPart {
                content_type: "text/plain".to_string(),
                content: content.clone(),
                charset: None,
            }]
        })
        .unwrap_or_default();
    let body_text = resolved.unwrap_or_else(|| NO_BODY_PLACEHOLDER.to_string());

    let attachments = raw
        .attachments
        .into_iter()
        .enumerate()
        .map(|(idx, a)| Attachment {
            id: format!("{}-att{}", id, idx + 1),
            filename: if a.filename.is_empty() {
                "attachment".to_string()
            } else {
                a.filename
            },
            size: a.payload.as_ref().map(|p| p.len() as u64),
            sha256: a.payload.as_deref().map(sha256_hex),
            content_type: a.content_type,
            payload: a.payload,
        })
        .collect();

    Message {
        id,
        source: raw.source,
        source_path: Some(raw.source_path),
        subject: clean_text(&raw.subject),
        sender: clean_text(&raw.sender),
        to: raw.to,
        cc: raw.cc,
        bcc: raw.bcc,
        sent_at,
        body_text,
        body_html: raw.body_html,
        body_parts,
        attachments,
        headers: raw.headers,
        hashes: raw.source_sha256.map(HashInfo::sha256).into_iter().collect(),
    }
}

/// Normalize line endings and trim outer whitespace.
pub fn clean_text(value: &str) -> String {
    value
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}

/// Split an address header on commas and semicolons, trimming each entry.
pub fn split_addresses(raw: &str) -> Vec<String> {
    raw.replace(';', ",")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a source timestamp, normalizing to UTC.
///
/// Order: RFC 2822, RFC 3339, then a fixed format list with day-first
/// slash dates ahead of month-first, so ambiguous dates resolve
/// day-first. Naive datetimes are taken as UTC. A trailing
/// parenthesized zone name like `" (UTC)"` is stripped first.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let mut s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.ends_with(')') {
        if let Some(open) = s.rfind('(') {
            s = s[..open].trim_end();
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];
    for fmt in &formats {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    debug!(date = s, "No recognized timestamp format");
    None
}

fn file_stem(path: &Path, fallback: &str) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(body: Option<&str>, html: Option<&str>) -> RawMessage {
        RawMessage {
            source_path: PathBuf::from("/in/note.eml"),
            source: "/in/note.eml".to_string(),
            body: body.map(String::from),
            body_html: html.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_split_addresses_mixed_separators() {
        let got = split_addresses("a@x.com; b@y.com, Jane <c@z.com>");
        assert_eq!(got, vec!["a@x.com", "b@y.com", "Jane <c@z.com>"]);
    }

    #[test]
    fn test_split_addresses_empty_entries_dropped() {
        assert_eq!(split_addresses(" ; , a@x.com ,"), vec!["a@x.com"]);
        assert!(split_addresses("").is_empty());
    }

    #[test]
    fn test_parse_timestamp_rfc2822() {
        let dt = parse_timestamp("Thu, 04 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-04T10:00:00+00:00");
    }

    #[test]
    fn test_parse_timestamp_rfc2822_zone_comment() {
        let dt = parse_timestamp("Thu, 04 Jan 2024 10:00:00 +0200 (CEST)").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-04T08:00:00+00:00");
    }

    #[test]
    fn test_parse_timestamp_iso_with_offset() {
        let dt = parse_timestamp("2024-01-04T10:00:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-04T08:00:00+00:00");
    }

    #[test]
    fn test_parse_timestamp_naive_is_utc() {
        let dt = parse_timestamp("2024-01-04T10:00:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-04T10:00:00+00:00");
    }

    #[test]
    fn test_parse_timestamp_day_first_wins() {
        // 03/04 is ambiguous; day-first order means April 3rd
        let dt = parse_timestamp("03/04/2024 12:00:00").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-04-03");
    }

    #[test]
    fn test_parse_timestamp_unrecognized() {
        assert!(parse_timestamp("yesterday at noon").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_body_placeholder_when_nothing_extractable() {
        let m = into_message(raw(None, None));
        assert_eq!(m.body_text, NO_BODY_PLACEHOLDER);
        assert!(m.body_parts.is_empty());
    }

    #[test]
    fn test_body_html_fallback() {
        let m = into_message(raw(None, Some("<p>Hello</p><br>World")));
        assert_eq!(m.body_text, "Hello\n\nWorld");
        assert_eq!(m.body_parts.len(), 1);
        assert_eq!(m.body_parts[0].content_type, "text/plain");
    }

    #[test]
    fn test_blank_body_falls_through_to_html() {
        let m = into_message(raw(Some("   \n  "), Some("<p>real</p>")));
        assert_eq!(m.body_text, "real");
    }

    #[test]
    fn test_id_from_message_id_else_stem() {
        let mut r = raw(Some("x"), None);
        r.message_id = Some("<m1@example.com>".to_string());
        assert_eq!(into_message(r).id, "<m1@example.com>");

        let r2 = raw(Some("x"), None);
        assert_eq!(into_message(r2).id, "note");
    }

    #[test]
    fn test_attachment_ids_and_decoded_hashes() {
        let mut r = raw(Some("x"), None);
        r.message_id = Some("<m@x>".to_string());
        r.attachments = vec![
            RawAttachment {
                filename: "a.txt".to_string(),
                content_type: Some("text/plain".to_string()),
                payload: Some(b"hello world".to_vec()),
            },
            RawAttachment {
                filename: String::new(),
                content_type: None,
                payload: None,
            },
        ];
        let m = into_message(r);
        assert_eq!(m.attachments[0].id, "<m@x>-att1");
        assert_eq!(m.attachments[1].id, "<m@x>-att2");
        assert_eq!(m.attachments[0].size, Some(11));
        assert_eq!(
            m.attachments[0].sha256.as_deref(),
            Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
        assert_eq!(m.attachments[1].filename, "attachment");
        assert_eq!(m.attachments[1].size, None);
        assert_eq!(m.attachments[1].sha256, None);
    }

    #[test]
    fn test_crlf_normalized() {
        let m = into_message(raw(Some("line one\r\nline two\r\n"), None));
        assert_eq!(m.body_text, "line one\nline two");
    }
}
