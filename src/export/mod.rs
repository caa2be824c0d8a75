//! Export functionality: text artifact, JSON sidecar, hash manifest.

pub mod hashes;
pub mod json;
pub mod record;
pub mod text;

pub use hashes::export_hashes;
pub use json::export_json;
pub use record::{AttachmentRecord, MessageRecord};
pub use text::{export_text, TextExporter};
