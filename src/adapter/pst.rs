//! Adapter for Outlook archive files (`.pst`, `.ost`).
//!
//! Archives are converted to one RFC822 file per message by the external
//! tool bridge, then each produced file goes through the Eml adapter. The
//! extraction directory layout carries the original folder tree, which is
//! preserved when loading into a `Mailbox`. Scratch space lives in a
//! temporary directory removed on drop, so extracted members must be
//! consumed before the `Extraction` goes away.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::adapter::eml;
use crate::error::{Result, VaultError};
use crate::model::{FolderId, Mailbox, Message};
use crate::readpst::ArchiveTool;

/// One converted archive: the produced RFC822 files plus the scratch
/// directory keeping them alive.
pub struct Extraction {
    out_dir: PathBuf,
    files: Vec<PathBuf>,
    _scratch: tempfile::TempDir,
}

impl Extraction {
    /// Produced files, sorted lexicographically.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Composite locator for a produced file: `"<archive> :: <member>"`.
    pub fn member_source(&self, archive: &Path, file: &Path) -> String {
        let rel = file.strip_prefix(&self.out_dir).unwrap_or(file);
        format!("{} :: {}", archive.display(), rel.display())
    }

    /// Path of a produced file relative to the extraction root.
    pub fn member_path<'a>(&self, file: &'a Path) -> &'a Path {
        file.strip_prefix(&self.out_dir).unwrap_or(file)
    }
}

/// Run the tool over `archive` into fresh scratch space.
pub fn extract_archive(archive: &Path, tool: &dyn ArchiveTool) -> Result<Extraction> {
    if !archive.is_file() {
        return Err(VaultError::NotFound(archive.to_path_buf()));
    }

    let scratch = tempfile::Builder::new()
        .prefix("mailvault_pst_")
        .tempdir()
        .map_err(|e| VaultError::io(archive, e))?;

    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    let out_dir = scratch.path().join(format!("{stem}_readpst"));
    fs::create_dir_all(&out_dir).map_err(|e| VaultError::io(&out_dir, e))?;

    let files = tool.run(archive, &out_dir)?;
    debug!(
        archive = %archive.display(),
        count = files.len(),
        "Archive conversion finished"
    );

    Ok(Extraction {
        out_dir,
        files,
        _scratch: scratch,
    })
}

/// Load an adapted message from one produced file, rewriting its locator
/// to the composite `"<archive> :: <member>"` form.
pub fn load_member(
    extraction: &Extraction,
    archive: &Path,
    file: &Path,
) -> Result<Message> {
    let mut message = eml::load_message(file)?;
    message.source = extraction.member_source(archive, file);
    message.source_path = Some(archive.to_path_buf());
    Ok(message)
}

/// Convert `archive` and load every produced message into a folder tree
/// mirroring the extraction layout. Members that fail to parse are
/// skipped with a warning; the archive itself failing is an error.
pub fn load_mailbox(archive: &Path, tool: &dyn ArchiveTool) -> Result<Mailbox> {
    let extraction = extract_archive(archive, tool)?;

    let display_name = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());

    let mut mailbox = Mailbox::new(archive, display_name.clone());
    let root = mailbox.add_root(display_name.to_lowercase(), display_name, "/");

    let mut known: HashMap<PathBuf, FolderId> = HashMap::new();
    known.insert(PathBuf::new(), root);

    for file in extraction.files() {
        let rel = extraction.member_path(file);
        let parent_rel = rel.parent().unwrap_or_else(|| Path::new(""));
        let folder = ensure_folder(&mut mailbox, &mut known, root, parent_rel);

        match load_member(&extraction, archive, file) {
            Ok(message) => mailbox.add_message(folder, message),
            Err(e) => warn!(
                member = %rel.display(),
                error = %e,
                "Skipping unreadable archive member"
            ),
        }
    }

    Ok(mailbox)
}

/// Find or create the folder chain for a relative extraction path.
fn ensure_folder(
    mailbox: &mut Mailbox,
    known: &mut HashMap<PathBuf, FolderId>,
    root: FolderId,
    rel: &Path,
) -> FolderId {
    if let Some(id) = known.get(rel) {
        return *id;
    }

    let parent = match rel.parent() {
        Some(p) => ensure_folder(mailbox, known, root, p),
        None => root,
    };

    let name = rel
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.is_empty() {
        known.insert(rel.to_path_buf(), root);
        return root;
    }

    let path = folder_path_string(rel);
    let id = mailbox.add_subfolder(parent, path.to_lowercase(), name, path);
    known.insert(rel.to_path_buf(), id);
    id
}

/// `"/Inbox/2021"` style path for a relative extraction path.
fn folder_path_string(rel: &Path) -> String {
    let mut s = String::new();
    for comp in rel.components() {
        s.push('/');
        s.push_str(&comp.as_os_str().to_string_lossy());
    }
    if s.is_empty() {
        s.push('/');
    }
    s
}
