//! Canonical data model: messages, attachments, folder trees, mailboxes.

pub mod mailbox;
pub mod message;

pub use mailbox::{FolderId, Mailbox};
pub use message::{Attachment, BodyPart, HashInfo, Message, NO_BODY_PLACEHOLDER};
