//! Primary text artifact.
//!
//! The exporter streams: it holds the destination open for the whole
//! run and writes one block per message as the batch produces it, so
//! memory stays bounded regardless of batch size. Failed items get an
//! inline diagnostic block in the same stream. Any write failure is an
//! `Output` error, fatal to the run.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use encoding_rs::Encoding;

use crate::error::{Result, VaultError};
use crate::export::record::MessageRecord;
use crate::model::Message;

/// Width of the `=` separator rule between blocks.
pub const SEPARATOR_WIDTH: usize = 90;

/// Streaming writer for the text artifact.
#[derive(Debug)]
pub struct TextExporter {
    writer: BufWriter<File>,
    encoding: &'static Encoding,
    path: PathBuf,
}

impl TextExporter {
    /// Open `dest`, creating parent directories, and write the artifact
    /// header (banner, generation timestamp, source root).
    pub fn create(dest: &Path, source_label: &str, encoding_label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(encoding_label.as_bytes())
            .ok_or_else(|| VaultError::UnsupportedEncoding(encoding_label.to_string()))?;

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| VaultError::output(dest, e))?;
            }
        }
        let file = File::create(dest).map_err(|e| VaultError::output(dest, e))?;

        let mut exporter = Self {
            writer: BufWriter::new(file),
            encoding,
            path: dest.to_path_buf(),
        };
        exporter.write_str(&format!(
            "# Combined MSG/EML/PST Export\n# Created: {}\n# Source: {}\n\n",
            Local::now().to_rfc3339(),
            source_label
        ))?;
        Ok(exporter)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record block.
    pub fn write_record(&mut self, record: &MessageRecord, show_attachments: bool) -> Result<()> {
        let sep = "=".repeat(SEPARATOR_WIDTH);
        let mut block = String::new();
        block.push_str(&sep);
        block.push('\n');
        block.push_str(&format!("FILE: {}\n", record.file));
        block.push_str(&format!("SOURCE: {}\n", record.source));
        block.push_str(&format!("DATE: {}\n", record.date));
        block.push_str(&format!("FROM: {}\n", record.sender));
        block.push_str(&format!("TO: {}\n", record.to));
        block.push_str(&format!("SUBJECT: {}\n", record.subject));
        if !record.message_id.is_empty() {
            block.push_str(&format!("MESSAGE-ID: {}\n", record.message_id));
        }
        if show_attachments && !record.attachments.is_empty() {
            block.push_str("ATTACHMENTS:\n");
            for att in &record.attachments {
                let size_part = match att.size {
                    Some(n) => format!("{n} bytes"),
                    None => "unknown size".to_string(),
                };
                match &att.sha256 {
                    Some(hash) => block.push_str(&format!(
                        "  - {} ({size_part}, sha256={hash})\n",
                        att.filename
                    )),
                    None => block.push_str(&format!("  - {} ({size_part})\n", att.filename)),
                }
            }
        }
        block.push('\n');
        block.push_str(&record.body);
        block.push_str("\n\n");
        block.push_str(&sep);
        block.push_str("\n\n");
        self.write_str(&block)
    }

    /// Write an inline diagnostic block for a failed item.
    pub fn write_error(&mut self, heading: &str, detail: &str) -> Result<()> {
        let sep = "=".repeat(SEPARATOR_WIDTH);
        let mut block = String::new();
        block.push_str(&sep);
        block.push('\n');
        block.push_str(&format!("{heading}:\n"));
        block.push_str(detail);
        if !detail.ends_with('\n') {
            block.push('\n');
        }
        block.push_str(&sep);
        block.push_str("\n\n");
        self.write_str(&block)
    }

    /// Flush buffered output and close the artifact.
    pub fn finish(mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| VaultError::output(&self.path, e))
    }

    fn write_str(&mut self, s: &str) -> Result<()> {
        let (bytes, _, _) = self.encoding.encode(s);
        self.writer
            .write_all(&bytes)
            .map_err(|e| VaultError::output(&self.path, e))
    }
}

/// Write a complete text artifact in one call.
pub fn export_text(
    messages: &[Message],
    dest: &Path,
    source_label: &str,
    show_attachments: bool,
    encoding_label: &str,
) -> Result<()> {
    let mut exporter = TextExporter::create(dest, source_label, encoding_label)?;
    for message in messages {
        let record = MessageRecord::from_message(message);
        exporter.write_record(&record, show_attachments)?;
    }
    exporter.finish()
}
