//! Format adapters.
//!
//! One adapter per source format, selected by file extension. Every
//! adapter produces the canonical model types from `crate::model`; the
//! quirks of each format stay inside its module, behind a typed raw
//! record and a pure mapping step.

pub mod eml;
pub mod html;
pub mod msg;
pub mod pst;
pub mod record;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, VaultError};
use crate::model::{Mailbox, Message};
use crate::readpst::ArchiveTool;

/// Adapter family for one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Compound-binary Outlook message (`.msg`).
    Msg,
    /// RFC822/MIME text message (`.eml`).
    Eml,
    /// Outlook archive container (`.pst`, `.ost`).
    Pst,
}

impl SourceFormat {
    /// Case-insensitive extension mapping; `None` for anything else.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "msg" => Some(Self::Msg),
            "eml" => Some(Self::Eml),
            "pst" | "ost" => Some(Self::Pst),
            _ => None,
        }
    }

    /// Kind string used in progress events and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Msg => "msg",
            Self::Eml => "eml",
            Self::Pst => "pst",
        }
    }
}

/// Adapt one single-message file (`.msg` or `.eml`).
pub fn load_single_message(path: &Path) -> Result<Message> {
    match SourceFormat::detect(path) {
        Some(SourceFormat::Msg) => msg::load_message(path),
        Some(SourceFormat::Eml) => eml::load_message(path),
        _ => Err(VaultError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Adapt an explicit list of single-message files. Directories in the
/// list are expanded to their message files, recursively and sorted.
/// Any failure aborts the whole list; per-item tolerance belongs to the
/// batch runner.
pub fn load_messages_from_files(paths: &[PathBuf]) -> Result<Vec<Message>> {
    let mut messages = Vec::with_capacity(paths.len());
    for path in paths {
        if path.is_dir() {
            for file in collect_message_files(path)? {
                messages.push(load_single_message(&file)?);
            }
        } else {
            messages.push(load_single_message(path)?);
        }
    }
    Ok(messages)
}

/// All `.msg`/`.eml` files under `dir`, recursively, sorted.
pub fn collect_message_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_into(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_into(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| VaultError::io(dir, e))? {
        let entry = entry.map_err(|e| VaultError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_into(&path, files)?;
        } else if matches!(
            SourceFormat::detect(&path),
            Some(SourceFormat::Msg | SourceFormat::Eml)
        ) {
            files.push(path);
        }
    }
    Ok(())
}

/// Load a mailbox view of `path`.
///
/// A directory becomes one synthetic folder holding its message files in
/// sorted order; an archive keeps the folder tree its extraction
/// produced; a single message file becomes a one-folder mailbox.
pub fn load_mailbox(path: &Path, tool: &dyn ArchiveTool) -> Result<Mailbox> {
    if path.is_dir() {
        return load_directory_mailbox(path);
    }

    match SourceFormat::detect(path) {
        Some(SourceFormat::Pst) => pst::load_mailbox(path, tool),
        Some(_) => {
            let message = load_single_message(path)?;
            let name = display_name(path);
            let mut mailbox = Mailbox::new(path, name.clone());
            let root = mailbox.add_root(name.to_lowercase(), name, "/");
            mailbox.add_message(root, message);
            Ok(mailbox)
        }
        None => Err(VaultError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn load_directory_mailbox(dir: &Path) -> Result<Mailbox> {
    let files = collect_message_files(dir)?;

    let name = display_name(dir);
    let mut mailbox = Mailbox::new(dir, name.clone());
    let root = mailbox.add_root(name.to_lowercase(), name, "/");
    for file in files {
        match load_single_message(&file) {
            Ok(message) => mailbox.add_message(root, message),
            Err(e) => warn!(
                file = %file.display(),
                error = %e,
                "Skipping unreadable message file"
            ),
        }
    }
    Ok(mailbox)
}

fn display_name(path: &Path) -> String {
    let base = if path.is_dir() {
        path.file_name()
    } else {
        path.file_stem()
    };
    base.map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mailbox".to_string())
}
