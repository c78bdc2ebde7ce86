//! In-memory tag state for one playlist file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Editable tag metadata plus playback/eligibility flags for one audio file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub artist: String,
    pub title: String,
    /// Zero-padded "NN/MM" form once enriched.
    pub track_number: String,
    pub album: String,
    pub release_year: String,
    pub album_artist: String,
    pub genre: String,
    pub comment: String,
    pub bpm: Option<u32>,
    pub embedded_image: Option<Vec<u8>>,
    pub playing: bool,
    needs_lookup: bool,
}

/// Record handle shared between the playlist owner and the enrichment worker.
pub type SharedFileRecord = Arc<Mutex<FileRecord>>;

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the loader judged this record's artist/title unreliable.
    pub fn needs_metadata_lookup(&self) -> bool {
        self.needs_lookup
    }

    pub fn set_needs_metadata_lookup(&mut self, needs_lookup: bool) {
        self.needs_lookup = needs_lookup;
    }

    pub fn into_shared(self) -> SharedFileRecord {
        Arc::new(Mutex::new(self))
    }

    /// Short human label used in log lines.
    pub fn label(&self) -> String {
        if self.artist.trim().is_empty() && self.title.trim().is_empty() {
            return self
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string());
        }
        format!("{} - {}", self.artist, self.title)
    }
}

/// Fully-formed set of corrected tag values for one record.
///
/// Built away from the record and committed with [`TagPatch::apply_to`] so
/// readers never see fields from two different candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagPatch {
    pub artist: String,
    pub title: String,
    pub track_number: String,
    pub album: String,
    pub release_year: String,
    pub album_artist: String,
    pub genre: String,
    pub comment: String,
    pub bpm: u32,
    /// `None` keeps whatever image the record already has.
    pub embedded_image: Option<Vec<u8>>,
}

impl TagPatch {
    pub fn apply_to(&self, record: &mut FileRecord) {
        record.artist = self.artist.clone();
        record.title = self.title.clone();
        record.track_number = self.track_number.clone();
        record.album = self.album.clone();
        record.release_year = self.release_year.clone();
        record.album_artist = self.album_artist.clone();
        record.genre = self.genre.clone();
        record.comment = self.comment.clone();
        record.bpm = Some(self.bpm);
        if let Some(image) = &self.embedded_image {
            record.embedded_image = Some(image.clone());
        }
        record.needs_lookup = false;
    }
}
