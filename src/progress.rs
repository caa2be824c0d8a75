//! Batch progress events and the append-only JSONL log.
//!
//! The runner reports progress through a callback receiving typed
//! events; the log file is one optional consumer of that callback. Each
//! event is serialized as a single JSON line with a `phase` tag, and
//! lines are only ever appended, so a consumer can tail the file by byte
//! offset without missing or re-reading events.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

/// One progress event emitted by the batch runner.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Input enumeration finished; counts per recognized format.
    Scan { msg: usize, eml: usize, pst: usize },

    /// One file adapted successfully; `processed` is the running count.
    Processed {
        kind: &'static str,
        file: String,
        processed: usize,
    },

    /// Archive conversion is about to start.
    PstStart { archive: String },

    /// Archive conversion finished; `count` messages were produced.
    PstExtracted { archive: String, count: usize },

    /// The conversion tool is unavailable; all archives are skipped.
    PstSkipped { reason: String },

    /// Terminal event, emitted unconditionally.
    Done { processed: usize, errors: usize },
}

/// Append-only JSONL progress log.
///
/// Created fresh at batch start; a stale log at the same path is
/// deleted first. Write failures are logged and swallowed, progress
/// reporting never fails a batch.
pub struct ProgressLog {
    file: File,
    path: PathBuf,
}

impl ProgressLog {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a JSON line.
    pub fn record(&mut self, event: &ProgressEvent) {
        match serde_json::to_string(event) {
            Ok(line) => {
                if let Err(e) = writeln!(self.file, "{line}") {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Progress log write failed"
                    );
                }
            }
            Err(e) => warn!(error = %e, "Progress event serialization failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_events_tagged_by_phase() {
        let scan = serde_json::to_value(ProgressEvent::Scan {
            msg: 2,
            eml: 3,
            pst: 1,
        })
        .unwrap();
        assert_eq!(scan["phase"], "scan");
        assert_eq!(scan["msg"], 2);
        assert_eq!(scan["eml"], 3);
        assert_eq!(scan["pst"], 1);

        let processed = serde_json::to_value(ProgressEvent::Processed {
            kind: "pst-eml",
            file: "old.pst :: Inbox/1.eml".to_string(),
            processed: 7,
        })
        .unwrap();
        assert_eq!(processed["phase"], "processed");
        assert_eq!(processed["kind"], "pst-eml");
        assert_eq!(processed["processed"], 7);

        let skipped = serde_json::to_value(ProgressEvent::PstSkipped {
            reason: "readpst not found".to_string(),
        })
        .unwrap();
        assert_eq!(skipped["phase"], "pst_skipped");

        let done = serde_json::to_value(ProgressEvent::Done {
            processed: 9,
            errors: 1,
        })
        .unwrap();
        assert_eq!(done["phase"], "done");
        assert_eq!(done["errors"], 1);
    }

    #[test]
    fn test_log_appends_one_line_per_event() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("progress.jsonl");

        let mut log = ProgressLog::create(&path).unwrap();
        log.record(&ProgressEvent::Scan {
            msg: 0,
            eml: 1,
            pst: 0,
        });
        log.record(&ProgressEvent::Done {
            processed: 1,
            errors: 0,
        });
        drop(log);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        let last: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first["phase"], "scan");
        assert_eq!(last["phase"], "done");
        assert_eq!(last["processed"], 1);
    }

    #[test]
    fn test_stale_log_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("progress.jsonl");
        fs::write(&path, "old contents\n").unwrap();

        let mut log = ProgressLog::create(&path).unwrap();
        log.record(&ProgressEvent::Done {
            processed: 0,
            errors: 0,
        });
        drop(log);

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("old contents"));
        assert_eq!(content.lines().count(), 1);
    }
}
