//! File record model and tag persistence.

mod file_record;
pub mod tag_store;

pub use file_record::{FileRecord, SharedFileRecord, TagPatch};

/// Commits a record's enriched fields (and optional cover art) to durable storage.
pub trait TagPersistence: Send + Sync {
    fn persist_tags_with_image(&self, record: &FileRecord, image: Option<&[u8]>)
        -> Result<(), String>;
}
