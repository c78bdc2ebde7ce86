//! Event-bus protocol shared between the enrichment worker and its observers.

use std::path::PathBuf;

use crate::metadata::TagPatch;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Enrichment(EnrichmentMessage),
}

/// Field values written to a record, without the artwork payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedFields {
    pub artist: String,
    pub title: String,
    pub track_number: String,
    pub album: String,
    pub release_year: String,
    pub album_artist: String,
    pub genre: String,
    pub comment: String,
    pub bpm: u32,
    pub artwork_updated: bool,
}

impl From<&TagPatch> for EnrichedFields {
    fn from(patch: &TagPatch) -> Self {
        Self {
            artist: patch.artist.clone(),
            title: patch.title.clone(),
            track_number: patch.track_number.clone(),
            album: patch.album.clone(),
            release_year: patch.release_year.clone(),
            album_artist: patch.album_artist.clone(),
            genre: patch.genre.clone(),
            comment: patch.comment.clone(),
            bpm: patch.bpm,
            artwork_updated: patch.embedded_image.is_some(),
        }
    }
}

/// Per-batch counters reported when a run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    /// Records whose lookup predicate was true.
    pub eligible: usize,
    pub enriched: usize,
    /// Records with no catalog match.
    pub skipped: usize,
    /// Records hit by a search or persistence failure.
    pub failed: usize,
    pub cancelled: bool,
}

/// Enrichment batch lifecycle notifications.
#[derive(Debug, Clone)]
pub enum EnrichmentMessage {
    BatchStarted {
        generation: u64,
        total: usize,
    },
    RecordEnriched {
        generation: u64,
        index: usize,
        path: PathBuf,
        fields: EnrichedFields,
        /// Set when the tags were committed in memory but could not be saved.
        persist_error: Option<String>,
    },
    RecordSkipped {
        generation: u64,
        index: usize,
        path: PathBuf,
        reason: String,
    },
    BatchCancelled {
        generation: u64,
    },
    BatchFinished {
        generation: u64,
        summary: BatchSummary,
    },
}
