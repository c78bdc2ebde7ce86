//! Blocking HTTP catalog search and artwork download.
//!
//! Searches hit `<base_url>/search?q=<artist> <title>&type=releases` and
//! expect a `{"releases": [...]}` JSON document. Only the first release that
//! carries at least one track is used.

use std::io::Read;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;
use serde::Deserialize;

use super::{ArtworkFetcher, CatalogEntry, CatalogSearch, CatalogTrack};
use crate::config::CatalogConfig;
use crate::metadata::tag_store::artwork_mime_type;
use crate::metadata::FileRecord;

const RATE_LIMIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    releases: Vec<ReleasePayload>,
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    tracks: Vec<TrackPayload>,
    #[serde(default)]
    artists: Vec<String>,
    #[serde(default)]
    label: String,
    #[serde(default)]
    catalog: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    album_art_url: String,
}

#[derive(Debug, Deserialize)]
struct TrackPayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    mix: String,
    #[serde(default)]
    artists: Vec<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    bpm: Option<f64>,
    #[serde(default)]
    position: Option<u32>,
}

impl ReleasePayload {
    fn into_entry(self) -> CatalogEntry {
        let tracks = self
            .tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| CatalogTrack {
                title: track.title,
                mix: track.mix,
                artists: track.artists,
                genres: track.genres,
                bpm: track.bpm.map(|bpm| bpm.round().max(0.0) as u32).unwrap_or(0),
                position: track
                    .position
                    .filter(|position| *position > 0)
                    .unwrap_or(index as u32 + 1),
            })
            .collect();
        CatalogEntry {
            title: self.title,
            tracks,
            artists: self.artists,
            label: self.label,
            catalog: self.catalog,
            release_date: self.release_date,
            album_art_url: self.album_art_url,
        }
    }
}

fn build_agent(config: &CatalogConfig) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_millis(config.connect_timeout_ms))
        .timeout_read(Duration::from_millis(config.read_timeout_ms))
        .user_agent(&config.user_agent)
        .build()
}

/// Search text for a record: its artist and title, or the file stem when both
/// tags are blank.
fn search_query(record: &FileRecord) -> String {
    let query = format!("{} {}", record.artist.trim(), record.title.trim());
    let query = query.trim();
    if !query.is_empty() {
        return query.to_string();
    }
    record
        .path()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn search_url(base_url: &str, query: &str) -> String {
    format!(
        "{}/search?q={}&type=releases",
        base_url.trim_end_matches('/'),
        urlencoding::encode(query)
    )
}

/// Parses a search response body into the first release that has tracks.
fn parse_search_response(body: &str) -> Result<Option<CatalogEntry>, String> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|error| format!("Invalid JSON response: {error}"))?;
    Ok(response
        .releases
        .into_iter()
        .find(|release| !release.tracks.is_empty())
        .map(ReleasePayload::into_entry))
}

/// Catalog search over HTTP with request spacing enforced by a rate limiter.
pub struct HttpCatalogClient {
    http_client: ureq::Agent,
    base_url: String,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpCatalogClient {
    pub fn new(config: &CatalogConfig) -> Self {
        let quota = Quota::with_period(Duration::from_millis(config.min_request_interval_ms))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::MIN);
        Self {
            http_client: build_agent(config),
            base_url: config.base_url.clone(),
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Blocks until a request slot frees up. Returns false without taking a
    /// slot once `keep_waiting` turns false.
    fn wait_for_rate_limit_slot(&self, keep_waiting: &dyn Fn() -> bool) -> bool {
        while self.limiter.check().is_err() {
            if !keep_waiting() {
                return false;
            }
            std::thread::sleep(RATE_LIMIT_POLL_INTERVAL);
        }
        true
    }
}

impl CatalogSearch for HttpCatalogClient {
    fn search(&self, record: &FileRecord) -> Result<Option<CatalogEntry>, String> {
        self.search_while(record, &|| true)
    }

    fn search_while(
        &self,
        record: &FileRecord,
        keep_going: &dyn Fn() -> bool,
    ) -> Result<Option<CatalogEntry>, String> {
        let query = search_query(record);
        if query.is_empty() {
            return Ok(None);
        }
        if !self.wait_for_rate_limit_slot(keep_going) {
            return Err("Search abandoned while waiting for a request slot".to_string());
        }

        let url = search_url(&self.base_url, &query);
        debug!("Catalog search: {}", url);
        let response = match self
            .http_client
            .get(&url)
            .set("Accept", "application/json")
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => return Ok(None),
            Err(error) => return Err(format!("Request failed: {error}")),
        };

        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|error| format!("Failed to read response: {error}"))?;
        parse_search_response(&body)
    }
}

/// Downloads album art, rejecting oversized or non-image payloads.
pub struct HttpArtworkFetcher {
    http_client: ureq::Agent,
    max_bytes: u64,
}

impl HttpArtworkFetcher {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            http_client: build_agent(config),
            max_bytes: config.max_artwork_bytes,
        }
    }
}

fn validate_artwork(bytes: Vec<u8>, max_bytes: u64) -> Result<Vec<u8>, String> {
    if bytes.len() as u64 > max_bytes {
        return Err(format!("Album art exceeds {max_bytes} bytes"));
    }
    artwork_mime_type(&bytes)?;
    Ok(bytes)
}

impl ArtworkFetcher for HttpArtworkFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .http_client
            .get(url)
            .call()
            .map_err(|error| format!("Request failed: {error}"))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|error| format!("Failed to read response: {error}"))?;
        validate_artwork(bytes, self.max_bytes)
    }
}
