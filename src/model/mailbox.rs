//! Mailbox and folder tree, arena-backed.
//!
//! Folders and messages live in flat vectors addressed by index; folders
//! link to parents and children by `FolderId` handle. This keeps the tree
//! free of ownership cycles while still allowing parent back-references,
//! and flattening is a simple index walk.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::message::Message;

/// Opaque handle to a folder inside one `Mailbox`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderId(usize);

#[derive(Debug, Clone)]
struct FolderNode {
    id: String,
    name: String,
    path: String,
    parent: Option<FolderId>,
    children: Vec<FolderId>,
    /// Indices into `Mailbox::messages`.
    messages: Vec<usize>,
}

/// A container of folders and messages adapted from one source
/// (a `.pst` archive, a directory, or a single message file).
#[derive(Debug, Clone)]
pub struct Mailbox {
    /// Path of the container this mailbox was loaded from.
    pub source_path: PathBuf,

    /// Human-readable name, usually the container's file stem.
    pub display_name: String,

    folders: Vec<FolderNode>,
    messages: Vec<Message>,
    roots: Vec<FolderId>,
}

impl Mailbox {
    /// Create an empty mailbox for the given container.
    pub fn new(source_path: impl Into<PathBuf>, display_name: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            display_name: display_name.into(),
            folders: Vec::new(),
            messages: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Add a top-level folder.
    pub fn add_root(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> FolderId {
        let fid = FolderId(self.folders.len());
        self.folders.push(FolderNode {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            parent: None,
            children: Vec::new(),
            messages: Vec::new(),
        });
        self.roots.push(fid);
        fid
    }

    /// Add a folder beneath `parent`.
    pub fn add_subfolder(
        &mut self,
        parent: FolderId,
        id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> FolderId {
        let fid = FolderId(self.folders.len());
        self.folders.push(FolderNode {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            parent: Some(parent),
            children: Vec::new(),
            messages: Vec::new(),
        });
        self.folders[parent.0].children.push(fid);
        fid
    }

    /// Attach a message to a folder. Messages keep insertion order
    /// within their folder.
    pub fn add_message(&mut self, folder: FolderId, message: Message) {
        let idx = self.messages.len();
        self.messages.push(message);
        self.folders[folder.0].messages.push(idx);
    }

    /// Parent of a folder, `None` for roots.
    pub fn parent_of(&self, folder: FolderId) -> Option<FolderId> {
        self.folders[folder.0].parent
    }

    /// Folder path string, e.g. `"/Inbox/2021"`.
    pub fn folder_path(&self, folder: FolderId) -> &str {
        &self.folders[folder.0].path
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// All messages in depth-first folder order (each folder's own
    /// messages first, then its subfolders in insertion order).
    pub fn all_messages(&self) -> Vec<&Message> {
        self.dfs_indices()
            .into_iter()
            .map(|i| &self.messages[i])
            .collect()
    }

    /// Consume the mailbox, yielding messages in depth-first order.
    pub fn into_messages(self) -> Vec<Message> {
        let order = self.dfs_indices();
        let mut slots: Vec<Option<Message>> = self.messages.into_iter().map(Some).collect();
        order.into_iter().filter_map(|i| slots[i].take()).collect()
    }

    fn dfs_indices(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.messages.len());
        let mut stack: Vec<FolderId> = self.roots.iter().rev().copied().collect();
        while let Some(fid) = stack.pop() {
            let node = &self.folders[fid.0];
            out.extend_from_slice(&node.messages);
            for child in node.children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Nested JSON view of the whole tree, used by the RPC facade.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        let mut folders = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            folders.push(self.folder_value(*root)?);
        }
        Ok(json!({
            "source_path": path_string(&self.source_path),
            "display_name": self.display_name,
            "folders": folders,
        }))
    }

    fn folder_value(&self, fid: FolderId) -> serde_json::Result<Value> {
        let node = &self.folders[fid.0];
        let mut messages = Vec::with_capacity(node.messages.len());
        for idx in &node.messages {
            messages.push(serde_json::to_value(&self.messages[*idx])?);
        }
        let mut subfolders = Vec::with_capacity(node.children.len());
        for child in &node.children {
            subfolders.push(self.folder_value(*child)?);
        }
        Ok(json!({
            "id": node.id,
            "name": node.name,
            "path": node.path,
            "messages": messages,
            "subfolders": subfolders,
        }))
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
