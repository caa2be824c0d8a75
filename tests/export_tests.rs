//! Exporter integration tests: fixture files go through the adapter and
//! out to the JSON sidecar, the hash manifest, and the text artifact.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use mailvault::adapter;
use mailvault::export::text::SEPARATOR_WIDTH;
use mailvault::export::{export_hashes, export_json, export_text, MessageRecord};
use mailvault::hash::sha256_hex;
use mailvault::model::Message;

/// SHA-256 of the decoded `draft.txt` payload inside `attachment.eml`.
const DRAFT_SHA: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> Message {
    adapter::load_single_message(&fixture(name)).unwrap()
}

// ─── Test 1: JSON sidecar shape and typed round trip ────────────────

#[test]
fn test_json_sidecar_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("combined.txt.json");
    let messages = vec![load("simple.eml"), load("attachment.eml")];

    export_json(&messages, &dest, "/mail/in", Some(Path::new("combined.txt"))).unwrap();

    let parsed: Value = serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
    assert_eq!(parsed["source_root"], "/mail/in");
    assert_eq!(parsed["output_text"], "combined.txt");

    let records = parsed["messages"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["from"], "Jane Doe <jane@example.com>");
    assert_eq!(records[0]["date"], "2024-04-01T12:00:00+00:00");
    assert_eq!(records[1]["subject"], "Contract draft");
    assert_eq!(records[1]["attachments"][0]["filename"], "draft.txt");
    assert_eq!(records[1]["attachments"][0]["sha256"], DRAFT_SHA);

    let typed: Vec<MessageRecord> = serde_json::from_value(parsed["messages"].clone()).unwrap();
    assert_eq!(typed[0].subject, "Quarterly numbers");
    assert_eq!(typed[1].attachments[0].size, Some(11));
}

// ─── Test 2: Hash manifest rows ─────────────────────────────────────

#[test]
fn test_hash_manifest_rows() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("combined_hashes.csv");
    let messages = vec![load("simple.eml"), load("attachment.eml")];

    export_hashes(&messages, &dest).unwrap();

    let content = fs::read_to_string(&dest).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "type,parent_source,filename,size,sha256");
    assert_eq!(lines.len(), 4, "header, two messages, one attachment");

    let simple_sha = sha256_hex(&fs::read(fixture("simple.eml")).unwrap());
    assert!(lines[1].starts_with("message,"));
    assert!(
        lines[1].ends_with(&format!("simple.eml,,{simple_sha}")),
        "message row should carry an empty size, got: '{}'",
        lines[1]
    );
    assert!(lines[3].starts_with("attachment,"));
    assert!(
        lines[3].ends_with(&format!("draft.txt,11,{DRAFT_SHA}")),
        "attachment row should carry size and payload hash, got: '{}'",
        lines[3]
    );
}

// ─── Test 3: Text artifact layout with attachment listing ───────────

#[test]
fn test_text_artifact_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("combined.txt");
    let messages = vec![load("simple.eml"), load("attachment.eml")];

    export_text(&messages, &dest, "mail-input", true, "utf-8").unwrap();

    let text = fs::read_to_string(&dest).unwrap();
    assert!(text.starts_with("# Combined MSG/EML/PST Export\n"));
    assert!(text.contains("# Source: mail-input\n"));
    assert!(text.contains("SUBJECT: Quarterly numbers\n"));
    assert!(text.contains("SUBJECT: Contract draft\n"));
    assert!(text.contains("The attached figures cover January through March."));
    assert!(text.contains("Draft attached for review."));
    assert!(text.contains("ATTACHMENTS:\n"));
    assert!(text.contains(&format!("  - draft.txt (11 bytes, sha256={DRAFT_SHA})\n")));
    assert_eq!(
        text.matches(&"=".repeat(SEPARATOR_WIDTH)).count(),
        4,
        "two rules per message block"
    );
}
