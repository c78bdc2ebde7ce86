use thiserror::Error;

/// Per-record failure kinds. None of them abort a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("no catalog match: {0}")]
    NoMatch(String),

    #[error("fetch failed: {0}")]
    FetchFailure(String),

    #[error("failed to persist tags: {0}")]
    Persist(String),

    /// A newer batch superseded the one processing this record.
    #[error("batch superseded")]
    Cancelled,
}

impl EnrichmentError {
    /// Whether the record counts as skipped rather than failed in a summary.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::NoMatch(_))
    }
}
