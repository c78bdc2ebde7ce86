//! Catalog data model and the collaborator traits the enrichment core consumes.

pub mod http_catalog;

use crate::metadata::FileRecord;

/// One track inside a catalog release.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogTrack {
    pub title: String,
    /// Mix/version label, e.g. "Original Mix".
    pub mix: String,
    pub artists: Vec<String>,
    pub genres: Vec<String>,
    pub bpm: u32,
    /// 1-based position within the parent release.
    pub position: u32,
}

/// A release ("album") returned by a successful catalog search.
///
/// Search hits always carry at least one track; an empty result is `None`
/// at the [`CatalogSearch`] boundary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogEntry {
    pub title: String,
    pub tracks: Vec<CatalogTrack>,
    pub artists: Vec<String>,
    pub label: String,
    pub catalog: String,
    pub release_date: String,
    pub album_art_url: String,
}

/// Looks up the release a file most likely belongs to.
pub trait CatalogSearch: Send + Sync {
    /// Returns `Ok(None)` when the catalog has no usable release for `record`.
    fn search(&self, record: &FileRecord) -> Result<Option<CatalogEntry>, String>;

    /// Like [`search`](Self::search), but may give up early with an error once
    /// `keep_going` turns false, e.g. while waiting for a request slot.
    fn search_while(
        &self,
        record: &FileRecord,
        _keep_going: &dyn Fn() -> bool,
    ) -> Result<Option<CatalogEntry>, String> {
        self.search(record)
    }
}

/// Downloads raw bytes, used for album art.
pub trait ArtworkFetcher: Send + Sync {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, String>;
}
