//! Derives corrected tag values for a file from its matched catalog track.

use std::fmt::Display;

use log::{info, warn};

use crate::catalog::{ArtworkFetcher, CatalogEntry, CatalogTrack};
use crate::metadata::{FileRecord, TagPatch};

use super::error::EnrichmentError;
use super::normalizer::{derive_display_title, normalize_artist};

const ALBUM_ARTIST_SEPARATOR: &str = ", ";
const GENRE_SEPARATOR: &str = " / ";

/// Left-pads with '0' to at least two characters; longer values pass through.
pub fn zero_pad2(value: impl Display) -> String {
    format!("{value:0>2}")
}

/// "NN/MM" track field for `position` of `total`.
pub fn track_number_label(position: u32, total: usize) -> String {
    format!("{}/{}", zero_pad2(position), zero_pad2(total))
}

/// Builds the full patch for `file` from the chosen track and its release.
/// `artwork` of `None` leaves the record's current image in place.
pub fn build_patch(
    file: &FileRecord,
    track: &CatalogTrack,
    album: &CatalogEntry,
    artwork: Option<Vec<u8>>,
) -> TagPatch {
    TagPatch {
        artist: normalize_artist(&file.artist, &track.artists),
        title: format!(
            "{} ({})",
            derive_display_title(&track.title, &track.artists),
            track.mix
        ),
        track_number: track_number_label(track.position, album.tracks.len()),
        album: album.title.clone(),
        release_year: album.release_date.clone(),
        album_artist: album.artists.join(ALBUM_ARTIST_SEPARATOR),
        genre: track.genres.join(GENRE_SEPARATOR),
        comment: format!("{} [{}]", album.label, album.catalog),
        bpm: track.bpm,
        embedded_image: artwork,
    }
}

/// Downloads the release's album art.
pub fn fetch_artwork(
    fetcher: &dyn ArtworkFetcher,
    album: &CatalogEntry,
) -> Result<Vec<u8>, EnrichmentError> {
    if album.album_art_url.trim().is_empty() {
        return Err(EnrichmentError::FetchFailure(
            "release has no album art url".to_string(),
        ));
    }
    fetcher
        .fetch_bytes(&album.album_art_url)
        .map_err(EnrichmentError::FetchFailure)
}

/// Emits the per-record field report after a successful enrichment.
pub fn log_enriched_fields(prefix: &str, patch: &TagPatch) {
    info!("{prefix} Artist: {}", patch.artist);
    info!("{prefix} Title: {}", patch.title);
    info!("{prefix} Track: {}", patch.track_number);
    info!("{prefix} Album: {}", patch.album);
    info!("{prefix} Release date: {}", patch.release_year);
    info!("{prefix} Album artist: {}", patch.album_artist);
    info!("{prefix} Genre: {}", patch.genre);
    info!("{prefix} Comment: {}", patch.comment);
    info!("{prefix} BPM: {}", patch.bpm);
}

/// Fetches the release's album art, downgrading any failure to a warning.
/// `None` keeps whatever image the record already has.
pub fn resolve_artwork(
    fetcher: &dyn ArtworkFetcher,
    album: &CatalogEntry,
    prefix: &str,
    label: &str,
) -> Option<Vec<u8>> {
    match fetch_artwork(fetcher, album) {
        Ok(bytes) => Some(bytes),
        Err(error) => {
            warn!("{prefix} could not load album art for {label}: {error}");
            None
        }
    }
}

/// Computes the patch for `file` without touching it. Album art is fetched
/// only when a `fetcher` is given.
pub fn map_fields(
    file: &FileRecord,
    track: &CatalogTrack,
    album: &CatalogEntry,
    fetcher: Option<&dyn ArtworkFetcher>,
    prefix: &str,
) -> TagPatch {
    let artwork =
        fetcher.and_then(|fetcher| resolve_artwork(fetcher, album, prefix, &file.label()));
    build_patch(file, track, album, artwork)
}

/// Enriches `file` in place from `track`/`album`, fetching album art with
/// `fetcher`. An art failure is logged and leaves the current image alone.
pub fn enrich(
    file: &mut FileRecord,
    track: &CatalogTrack,
    album: &CatalogEntry,
    fetcher: &dyn ArtworkFetcher,
    prefix: &str,
) -> TagPatch {
    let patch = map_fields(file, track, album, Some(fetcher), prefix);
    patch.apply_to(file);
    log_enriched_fields(prefix, &patch);
    patch
}

#[cfg(test)]
mod tests {
    use super::{build_patch, enrich, map_fields, track_number_label, zero_pad2};
    use crate::catalog::{ArtworkFetcher, CatalogEntry, CatalogTrack};
    use crate::metadata::FileRecord;

    struct StaticArtwork(Result<Vec<u8>, String>);

    impl ArtworkFetcher for StaticArtwork {
        fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>, String> {
            self.0.clone()
        }
    }

    fn sample_release() -> CatalogEntry {
        let tracks = (1..=12)
            .map(|position| CatalogTrack {
                title: format!("Track {position}"),
                mix: "Original Mix".to_string(),
                artists: vec!["Alpha".to_string()],
                genres: vec!["Techno".to_string()],
                bpm: 125,
                position,
            })
            .collect::<Vec<_>>();
        CatalogEntry {
            title: "Night Drive EP".to_string(),
            tracks,
            artists: vec!["Alpha".to_string(), "Beta".to_string()],
            label: "Sample Label".to_string(),
            catalog: "SL001".to_string(),
            release_date: "2017-05-12".to_string(),
            album_art_url: "https://images.example/sl001.jpg".to_string(),
        }
    }

    fn featured_track() -> CatalogTrack {
        CatalogTrack {
            title: "Night Drive (feat. Beta)".to_string(),
            mix: "Extended Mix".to_string(),
            artists: vec!["Alpha".to_string(), "Beta".to_string()],
            genres: vec!["Techno".to_string(), "Peak Time".to_string()],
            bpm: 128,
            position: 3,
        }
    }

    fn sample_file() -> FileRecord {
        let mut file = FileRecord::new("/music/night_drive.mp3");
        file.artist = "Alpha, Beta".to_string();
        file.title = "Night Drive (Extended)".to_string();
        file.embedded_image = Some(vec![7, 7, 7]);
        file.set_needs_metadata_lookup(true);
        file
    }

    #[test]
    fn test_zero_pad2_pads_short_values_only() {
        assert_eq!(zero_pad2(3), "03");
        assert_eq!(zero_pad2(12), "12");
        assert_eq!(zero_pad2("7"), "07");
        assert_eq!(zero_pad2(123), "123");
    }

    #[test]
    fn test_track_number_label_third_of_twelve() {
        assert_eq!(track_number_label(3, 12), "03/12");
    }

    #[test]
    fn test_build_patch_maps_every_field() {
        let release = sample_release();
        let patch = build_patch(&sample_file(), &featured_track(), &release, Some(vec![1]));

        assert_eq!(patch.artist, "Alpha & Beta");
        assert_eq!(patch.title, "Night Drive (Extended Mix)");
        assert_eq!(patch.track_number, "03/12");
        assert_eq!(patch.album, "Night Drive EP");
        assert_eq!(patch.release_year, "2017-05-12");
        assert_eq!(patch.album_artist, "Alpha, Beta");
        assert_eq!(patch.genre, "Techno / Peak Time");
        assert_eq!(patch.comment, "Sample Label [SL001]");
        assert_eq!(patch.bpm, 128);
        assert_eq!(patch.embedded_image, Some(vec![1]));
    }

    #[test]
    fn test_enrich_applies_fields_and_artwork() {
        let mut file = sample_file();
        let fetcher = StaticArtwork(Ok(vec![4, 2]));

        enrich(&mut file, &featured_track(), &sample_release(), &fetcher, "Enrichment:");

        assert_eq!(file.title, "Night Drive (Extended Mix)");
        assert_eq!(file.embedded_image, Some(vec![4, 2]));
        assert!(!file.needs_metadata_lookup());
    }

    #[test]
    fn test_enrich_artwork_failure_still_updates_text_fields() {
        let mut file = sample_file();
        let fetcher = StaticArtwork(Err("connection reset".to_string()));

        enrich(&mut file, &featured_track(), &sample_release(), &fetcher, "Enrichment:");

        assert_eq!(file.artist, "Alpha & Beta");
        assert_eq!(file.title, "Night Drive (Extended Mix)");
        assert_eq!(file.genre, "Techno / Peak Time");
        assert_eq!(file.bpm, Some(128));
        assert_eq!(file.embedded_image, Some(vec![7, 7, 7]));
    }

    #[test]
    fn test_map_fields_without_fetcher_leaves_file_untouched() {
        let file = sample_file();
        let patch = map_fields(&file, &featured_track(), &sample_release(), None, "Enrichment:");

        assert_eq!(patch.embedded_image, None);
        assert_eq!(patch.title, "Night Drive (Extended Mix)");
        assert_eq!(file, sample_file());
    }

    #[test]
    fn test_enrich_without_art_url_keeps_existing_image() {
        let mut file = sample_file();
        let mut release = sample_release();
        release.album_art_url = String::new();
        let fetcher = StaticArtwork(Ok(vec![4, 2]));

        enrich(&mut file, &featured_track(), &release, &fetcher, "Enrichment:");

        assert_eq!(file.embedded_image, Some(vec![7, 7, 7]));
    }
}
