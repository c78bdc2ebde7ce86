//! Catalog match selection, field derivation and the background batch runner.

pub mod batch_controller;
pub mod candidate_selector;
pub mod edit_distance;
pub mod error;
pub mod field_mapper;
pub mod normalizer;

pub use batch_controller::{BatchController, BatchHandle, BatchState};
pub use error::EnrichmentError;
