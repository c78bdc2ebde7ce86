//! Catalog-driven tag enrichment for playlist audio files.
//!
//! A batch walks a playlist, searches an online catalog for each file whose
//! tags look unreliable, picks the closest catalog track and writes corrected
//! tags (and album art) back onto the file record.

pub mod catalog;
pub mod config;
pub mod enrichment;
pub mod metadata;
pub mod protocol;
