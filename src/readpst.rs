//! External tool bridge for archive extraction.
//!
//! The `.pst`/`.ost` formats are converted by the `readpst` binary rather
//! than parsed in-process. The bridge is a small capability trait so the
//! Pst adapter (and its tests) can inject a substitute without running a
//! real binary. An absent tool is a skip signal, never an error.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Result, VaultError};

/// Environment variable carrying an explicit tool path override.
pub const READPST_ENV: &str = "MAILVAULT_READPST";

const TOOL_NAME: &str = "readpst";

/// Capability interface for the archive conversion tool.
pub trait ArchiveTool {
    /// Locate the tool binary. `None` means the capability is absent.
    fn resolve(&self) -> Option<PathBuf>;

    /// Convert `archive` into message-per-file RFC822 output under
    /// `out_dir`, returning the produced files sorted lexicographically.
    fn run(&self, archive: &Path, out_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// The real `readpst` bridge.
///
/// Resolution order: `MAILVAULT_READPST`, then a configured override
/// path, then a bundled binary in `tools/` beside the current
/// executable, then a PATH lookup.
pub struct Readpst {
    override_path: Option<PathBuf>,
}

impl Readpst {
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self { override_path }
    }
}

impl ArchiveTool for Readpst {
    fn resolve(&self) -> Option<PathBuf> {
        if let Some(env_path) = env::var_os(READPST_ENV) {
            let p = PathBuf::from(env_path);
            if p.is_file() {
                return Some(p);
            }
            debug!(path = %p.display(), "Tool override does not exist, ignoring");
        }

        if let Some(p) = &self.override_path {
            if p.is_file() {
                return Some(p.clone());
            }
            debug!(path = %p.display(), "Configured tool path does not exist, ignoring");
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                let bundled = dir.join("tools").join(tool_file_name());
                if bundled.is_file() {
                    return Some(bundled);
                }
            }
        }

        search_path()
    }

    fn run(&self, archive: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let tool = self
            .resolve()
            .ok_or_else(|| VaultError::ToolUnavailable(TOOL_NAME.to_string()))?;

        info!(
            tool = %tool.display(),
            archive = %archive.display(),
            out_dir = %out_dir.display(),
            "Extracting archive"
        );

        let output = Command::new(&tool)
            .arg("-r") // recurse into folders
            .arg("-D") // plain folder names
            .arg("-e") // one RFC822 file per message
            .arg("-o")
            .arg(out_dir)
            .arg(archive)
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    VaultError::ToolUnavailable(TOOL_NAME.to_string())
                } else {
                    VaultError::io(&tool, e)
                }
            })?;

        if !output.status.success() {
            return Err(VaultError::ToolFailed {
                tool: TOOL_NAME.to_string(),
                archive: archive.to_path_buf(),
                status: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        collect_extracted(out_dir)
    }
}

/// All `.eml` files under `dir`, recursively, sorted for deterministic
/// processing order.
pub fn collect_extracted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    read_directory_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn read_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| VaultError::io(dir, e))? {
        let entry = entry.map_err(|e| VaultError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            read_directory_recursive(&path, files)?;
        } else if has_eml_extension(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn has_eml_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("eml"))
        .unwrap_or(false)
}

fn tool_file_name() -> String {
    if cfg!(windows) {
        format!("{TOOL_NAME}.exe")
    } else {
        TOOL_NAME.to_string()
    }
}

fn search_path() -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    for dir in env::split_paths(&paths) {
        let candidate = dir.join(tool_file_name());
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}
