//! Persistence Collaborators
//!
//! Where completed traces go once the stream has everything: the note
//! archive and the relational store. Both are best-effort.

pub mod archive;
pub mod markdown;
pub mod store;

pub use archive::{ObsidianArchive, TraceArchive};
pub use markdown::{archive_note_path, format_trace_markdown};
pub use store::{SqliteTraceStore, TraceStore};
