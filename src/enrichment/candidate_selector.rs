use crate::catalog::{CatalogEntry, CatalogTrack};

use super::edit_distance::distance;

/// The closest track of a release together with the release it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackMatch<'a> {
    pub track: &'a CatalogTrack,
    pub index: usize,
    pub distance: usize,
    pub entry: &'a CatalogEntry,
}

/// Text a file title is compared against: "<title> (<mix>)".
pub fn candidate_label(track: &CatalogTrack) -> String {
    format!("{} ({})", track.title, track.mix)
}

/// Picks the track whose "<title> (<mix>)" label is closest to `file_title`.
///
/// Ties keep the earliest track. A release without tracks yields `None`.
pub fn select_best_track<'a>(file_title: &str, entry: &'a CatalogEntry) -> Option<TrackMatch<'a>> {
    let mut best: Option<TrackMatch<'a>> = None;
    for (index, track) in entry.tracks.iter().enumerate() {
        let candidate_distance = distance(&candidate_label(track), file_title);
        let is_better = best
            .as_ref()
            .map_or(true, |current| candidate_distance < current.distance);
        if is_better {
            best = Some(TrackMatch {
                track,
                index,
                distance: candidate_distance,
                entry,
            });
        }
    }
    best
}
