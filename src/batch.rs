//! Batch runner.
//!
//! Enumerates an input root, dispatches every candidate file to its
//! adapter in a fixed group order (Msg, Eml, Pst), and aggregates the
//! results. Per-item failures are converted into counters and inline
//! text diagnostics, never propagated; only setup failures and text
//! output failures abort the run. Progress is reported through a
//! callback receiving typed events.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::adapter::{self, pst, SourceFormat};
use crate::error::{Result, VaultError};
use crate::export::record::MessageRecord;
use crate::export::text::TextExporter;
use crate::model::Message;
use crate::progress::ProgressEvent;
use crate::readpst::ArchiveTool;

/// Enumerated input set, grouped by format.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// The input path as given.
    pub root: PathBuf,

    /// Label for the text artifact header: the directory itself, or
    /// the parent directory for a single-file input.
    pub root_label: PathBuf,

    pub msg_files: Vec<PathBuf>,
    pub eml_files: Vec<PathBuf>,
    pub pst_files: Vec<PathBuf>,
}

impl ScanResult {
    pub fn total(&self) -> usize {
        self.msg_files.len() + self.eml_files.len() + self.pst_files.len()
    }

    pub fn scan_event(&self) -> ProgressEvent {
        ProgressEvent::Scan {
            msg: self.msg_files.len(),
            eml: self.eml_files.len(),
            pst: self.pst_files.len(),
        }
    }
}

/// Aggregated outcome of one batch run.
#[derive(Debug)]
pub struct Batch {
    /// Successfully adapted messages, in processing order.
    pub messages: Vec<Message>,
    pub processed: usize,
    pub errors: usize,
}

/// Enumerate candidate files under `input`.
///
/// A directory is walked recursively; each group is sorted for
/// deterministic ordering. A single file becomes a one-element group of
/// its format; an unrecognized single file is a setup error.
pub fn scan_input(input: &Path) -> Result<ScanResult> {
    if !input.exists() {
        return Err(VaultError::NotFound(input.to_path_buf()));
    }

    if input.is_dir() {
        let mut scan = ScanResult {
            root: input.to_path_buf(),
            root_label: input.to_path_buf(),
            msg_files: Vec::new(),
            eml_files: Vec::new(),
            pst_files: Vec::new(),
        };
        walk(input, &mut scan)?;
        scan.msg_files.sort();
        scan.eml_files.sort();
        scan.pst_files.sort();
        return Ok(scan);
    }

    let format = SourceFormat::detect(input)
        .ok_or_else(|| VaultError::UnsupportedFormat(input.to_path_buf()))?;
    let root_label = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let mut scan = ScanResult {
        root: input.to_path_buf(),
        root_label,
        msg_files: Vec::new(),
        eml_files: Vec::new(),
        pst_files: Vec::new(),
    };
    match format {
        SourceFormat::Msg => scan.msg_files.push(input.to_path_buf()),
        SourceFormat::Eml => scan.eml_files.push(input.to_path_buf()),
        SourceFormat::Pst => scan.pst_files.push(input.to_path_buf()),
    }
    Ok(scan)
}

fn walk(dir: &Path, scan: &mut ScanResult) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| VaultError::io(dir, e))? {
        let entry = entry.map_err(|e| VaultError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, scan)?;
            continue;
        }
        match SourceFormat::detect(&path) {
            Some(SourceFormat::Msg) => scan.msg_files.push(path),
            Some(SourceFormat::Eml) => scan.eml_files.push(path),
            Some(SourceFormat::Pst) => scan.pst_files.push(path),
            None => {}
        }
    }
    Ok(())
}

/// Run the batch over a scanned input set, streaming records into
/// `exporter` and reporting every event through `emit`.
pub fn run_batch(
    scan: &ScanResult,
    exporter: &mut TextExporter,
    tool: &dyn ArchiveTool,
    show_attachments: bool,
    emit: &mut dyn FnMut(&ProgressEvent),
) -> Result<Batch> {
    emit(&scan.scan_event());

    let mut batch = Batch {
        messages: Vec::new(),
        processed: 0,
        errors: 0,
    };
    let mut seen: HashSet<String> = HashSet::new();

    for (files, format) in [
        (&scan.msg_files, SourceFormat::Msg),
        (&scan.eml_files, SourceFormat::Eml),
    ] {
        for (idx, path) in files.iter().enumerate() {
            info!(
                kind = format.kind(),
                index = idx + 1,
                total = files.len(),
                path = %path.display(),
                "Processing"
            );
            match adapter::load_single_message(path) {
                Ok(message) => append(
                    &mut batch,
                    &mut seen,
                    message,
                    format.kind(),
                    exporter,
                    show_attachments,
                    emit,
                )?,
                Err(e) => record_failure(
                    &mut batch,
                    exporter,
                    &format!("ERROR reading {} (.{})", path.display(), format.kind()),
                    &e,
                )?,
            }
        }
    }

    if !scan.pst_files.is_empty() {
        if tool.resolve().is_none() {
            warn!("Archive inputs present but no conversion tool is available, skipping");
            emit(&ProgressEvent::PstSkipped {
                reason: "readpst not found".to_string(),
            });
        } else {
            for (idx, archive) in scan.pst_files.iter().enumerate() {
                info!(
                    kind = "pst",
                    index = idx + 1,
                    total = scan.pst_files.len(),
                    path = %archive.display(),
                    "Processing"
                );
                emit(&ProgressEvent::PstStart {
                    archive: archive.display().to_string(),
                });
                match pst::extract_archive(archive, tool) {
                    Ok(extraction) => {
                        emit(&ProgressEvent::PstExtracted {
                            archive: archive.display().to_string(),
                            count: extraction.len(),
                        });
                        for file in extraction.files() {
                            match pst::load_member(&extraction, archive, file) {
                                Ok(message) => append(
                                    &mut batch,
                                    &mut seen,
                                    message,
                                    "pst-eml",
                                    exporter,
                                    show_attachments,
                                    emit,
                                )?,
                                Err(e) => record_failure(
                                    &mut batch,
                                    exporter,
                                    &format!(
                                        "ERROR reading extracted message from {}",
                                        archive.display()
                                    ),
                                    &e,
                                )?,
                            }
                        }
                    }
                    Err(e) => record_failure(
                        &mut batch,
                        exporter,
                        &format!("ERROR converting PST {}", archive.display()),
                        &e,
                    )?,
                }
            }
        }
    }

    emit(&ProgressEvent::Done {
        processed: batch.processed,
        errors: batch.errors,
    });
    Ok(batch)
}

fn append(
    batch: &mut Batch,
    seen: &mut HashSet<String>,
    mut message: Message,
    kind: &'static str,
    exporter: &mut TextExporter,
    show_attachments: bool,
    emit: &mut dyn FnMut(&ProgressEvent),
) -> Result<()> {
    disambiguate(&mut message, seen);
    let record = MessageRecord::from_message(&message);
    exporter.write_record(&record, show_attachments)?;
    batch.processed += 1;
    emit(&ProgressEvent::Processed {
        kind,
        file: record.source,
        processed: batch.processed,
    });
    batch.messages.push(message);
    Ok(())
}

/// Later duplicates keep their own entry under `<id>-2`, `<id>-3`, ...
/// probing upward until a free id is found.
fn disambiguate(message: &mut Message, seen: &mut HashSet<String>) {
    if seen.insert(message.id.clone()) {
        return;
    }
    let base = message.id.clone();
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if seen.insert(candidate.clone()) {
            message.id = candidate;
            return;
        }
        n += 1;
    }
}

fn record_failure(
    batch: &mut Batch,
    exporter: &mut TextExporter,
    heading: &str,
    error: &VaultError,
) -> Result<()> {
    warn!(error = %error, "{heading}");
    batch.errors += 1;
    exporter.write_error(heading, &error_detail(error))
}

/// Diagnostic text for an inline error block. Tool failures carry the
/// captured process output.
fn error_detail(error: &VaultError) -> String {
    if let VaultError::ToolFailed {
        tool,
        status,
        stdout,
        stderr,
        ..
    } = error
    {
        format!("{tool} failed ({status})\nSTDOUT:\n{stdout}\n\nSTDERR:\n{stderr}")
    } else {
        error.to_string()
    }
}
