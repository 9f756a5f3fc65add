//! iHeart catalog
//!
//! Anonymous login, search across stations/artists/tracks, artist radio
//! sessions and live stations. The session established at login identifies
//! the user for every later call.

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use stationdeck::catalog::{
    preferred_stream, CatalogClient, LiveMetadata, QueueSession, SearchCategory, SearchHit,
};
use stationdeck::error::DeckError;
use stationdeck::Track;
use tracing::{debug, info, warn};

use crate::config::app::NAME;
use crate::config::providers::{IHEART_API_BASE, IHEART_HOST_NAME};
use crate::error::{AppError, Result};
use crate::network::HttpClient;

use super::non_empty;

/// Headers the web client sends on every request
const BASE_HEADERS: [(&str, &str); 4] = [
    ("X-hostName", IHEART_HOST_NAME),
    ("X-Locale", "en-US"),
    ("Referer", "https://www.iheart.com/"),
    ("Origin", "https://www.iheart.com"),
];

/// Ids arrive as numbers or strings depending on the endpoint
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =============================================================================
// API response types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    profile_id: Value,
    session_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: SearchResults,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResults {
    #[serde(default)]
    stations: Vec<IhStation>,
    #[serde(default)]
    artists: Vec<IhArtist>,
    #[serde(default)]
    tracks: Vec<IhTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IhStation {
    id: Value,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    frequency: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct IhArtist {
    id: Value,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IhTrack {
    id: Value,
    title: String,
    #[serde(default)]
    artist_id: Option<Value>,
    #[serde(default)]
    artist_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LiveStationsResponse {
    #[serde(default)]
    hits: Vec<LiveStationHit>,
}

#[derive(Debug, Deserialize)]
struct LiveStationHit {
    #[serde(default)]
    streams: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ArtistStationResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    /// Kept as raw JSON so each track carries its catalog record
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamItem {
    #[serde(default)]
    stream_url: Option<String>,
    #[serde(default)]
    content: Option<StreamContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamContent {
    id: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    artist_id: Option<Value>,
    #[serde(default)]
    album_name: Option<String>,
    #[serde(default)]
    album_id: Option<Value>,
    #[serde(default)]
    image_path: Option<String>,
}

// =============================================================================
// Conversions
// =============================================================================

impl IhStation {
    fn into_hit(self) -> Option<SearchHit> {
        let id = id_string(&self.id)?;
        let frequency = self.frequency.as_ref().and_then(|f| match f {
            Value::String(s) => non_empty(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let description = match (self.description.as_deref().and_then(non_empty), frequency) {
            (Some(d), Some(f)) => Some(format!("{} at {}", d, f)),
            (d, f) => d.or(f),
        };
        Some(SearchHit {
            id,
            name: self.name,
            category: SearchCategory::Stations,
            description,
            artist_id: None,
            locator: None,
        })
    }
}

impl IhArtist {
    fn into_hit(self) -> Option<SearchHit> {
        Some(SearchHit {
            id: id_string(&self.id)?,
            name: self.name,
            category: SearchCategory::Artists,
            description: None,
            artist_id: None,
            locator: None,
        })
    }
}

impl IhTrack {
    fn into_hit(self) -> Option<SearchHit> {
        let artist_id = self.artist_id.as_ref().and_then(id_string);
        let name = match self.artist_name.as_deref().and_then(non_empty) {
            Some(artist) => format!("{} - {}", self.title, artist),
            None => self.title,
        };
        Some(SearchHit {
            id: id_string(&self.id)?,
            name,
            category: SearchCategory::Tracks,
            description: None,
            artist_id,
            locator: None,
        })
    }
}

impl SearchResults {
    fn into_hits(self, category: SearchCategory) -> Vec<SearchHit> {
        match category {
            SearchCategory::Stations => self
                .stations
                .into_iter()
                .filter_map(IhStation::into_hit)
                .collect(),
            SearchCategory::Artists => self
                .artists
                .into_iter()
                .filter_map(IhArtist::into_hit)
                .collect(),
            SearchCategory::Tracks => self
                .tracks
                .into_iter()
                .filter_map(IhTrack::into_hit)
                .collect(),
        }
    }
}

/// Track for one batch item, keeping the item itself as the raw record
fn track_from_item(item: Value) -> Option<Track> {
    let parsed = StreamItem::deserialize(&item).ok()?;
    parsed.into_track().map(|track| track.with_raw(item))
}

impl StreamItem {
    fn into_track(self) -> Option<Track> {
        let locator = self.stream_url.as_deref().and_then(non_empty)?;
        let content = self.content?;
        let id = id_string(&content.id)?;

        let mut track = Track::new(id, content.title, locator)
            .with_credits(
                content.artist_name.unwrap_or_default(),
                content.album_name.unwrap_or_default(),
            )
            .with_duration(content.duration.unwrap_or(0));
        track.version = content.version.as_deref().and_then(non_empty);
        track.artist_id = content.artist_id.as_ref().and_then(id_string);
        track.album_id = content.album_id.as_ref().and_then(id_string);
        track.image_url = content.image_path.as_deref().and_then(non_empty);
        Some(track)
    }
}

impl LiveStationsResponse {
    fn into_locator(self) -> stationdeck::Result<String> {
        let hit = self
            .hits
            .into_iter()
            .next()
            .ok_or_else(|| DeckError::StreamUnavailable("unknown live station".to_string()))?;
        let streams: BTreeMap<String, String> = hit
            .streams
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect();
        preferred_stream(&streams)
    }
}

/// Live "now playing" may come flat or wrapped in `data`
fn live_metadata_from(value: &Value) -> LiveMetadata {
    let data = value.get("data").unwrap_or(value);
    let field = |key: &str| data.get(key).and_then(Value::as_str).and_then(non_empty);
    LiveMetadata {
        title: field("title"),
        artist: field("artist").or_else(|| field("artistName")),
        album: field("album").or_else(|| field("albumName")),
    }
}

// =============================================================================
// IHeartCatalog
// =============================================================================

pub struct IHeartCatalog {
    client: HttpClient,
    base_url: String,
    user_id: String,
    market_id: u32,
    page_size: usize,
}

impl IHeartCatalog {
    /// Log in anonymously as `device_id`
    pub fn login(device_id: &str, market_id: u32, page_size: usize) -> Result<Self> {
        Self::login_at(IHEART_API_BASE, device_id, market_id, page_size)
    }

    pub fn login_at(
        base_url: &str,
        device_id: &str,
        market_id: u32,
        page_size: usize,
    ) -> Result<Self> {
        let anonymous = HttpClient::with_headers(&BASE_HEADERS)?;
        let user_name = format!("anon{}", device_id);
        let login: LoginResponse = anonymous.post_form_json(
            &format!("{}/api/v1/account/loginOrCreateOauthUser", base_url),
            &[
                ("accessToken", "anon"),
                ("accessTokenType", "anon"),
                ("deviceId", device_id),
                ("deviceName", NAME),
                ("host", IHEART_HOST_NAME),
                ("oauthUuid", device_id),
                ("userName", &user_name),
            ],
        )?;

        let user_id = id_string(&login.profile_id).ok_or_else(|| {
            AppError::Engine(DeckError::Remote("login returned no profile id".to_string()))
        })?;
        info!(user_id = user_id.as_str(), "logged in to catalog");

        let mut headers: Vec<(&str, &str)> = BASE_HEADERS.to_vec();
        headers.extend([
            ("X-Ihr-Profile-Id", user_id.as_str()),
            ("X-Ihr-Session-Id", login.session_id.as_str()),
            ("X-User-Id", user_id.as_str()),
            ("X-Session-Id", login.session_id.as_str()),
        ]);

        Ok(Self {
            client: HttpClient::with_headers(&headers)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
            market_id,
            page_size,
        })
    }

    /// Profile id established at login
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl CatalogClient for IHeartCatalog {
    fn search(
        &self,
        keyword: &str,
        category: SearchCategory,
        offset: usize,
    ) -> stationdeck::Result<Vec<SearchHit>> {
        let request = self.client.inner().get(self.url("/api/v3/search/all")).query(&[
            ("boostMarketId", self.market_id.to_string()),
            ("startIndex", offset.to_string()),
            ("maxRows", self.page_size.to_string()),
            ("keyword", "true".to_string()),
            ("keywords", keyword.to_string()),
        ]);
        let response: SearchResponse = self.client.send_json(request)?;
        let hits = response.results.into_hits(category);
        debug!(keyword, %category, offset, count = hits.len(), "catalog search");
        Ok(hits)
    }

    fn resolve_queue_session(
        &self,
        user_id: &str,
        source_id: &str,
    ) -> stationdeck::Result<QueueSession> {
        let response: ArtistStationResponse = self.client.post_form_json(
            &self.url(&format!("/api/v2/playlists/{}/ARTIST/{}", user_id, source_id)),
            &[("contentId", source_id)],
        )?;
        if let Some(error) = response.error {
            return Err(DeckError::Remote(format!("artist station refused: {}", error)));
        }
        let id = response
            .id
            .as_ref()
            .and_then(id_string)
            .ok_or_else(|| DeckError::Remote("artist station has no id".to_string()))?;
        debug!(source_id, session = id.as_str(), "queue session opened");
        Ok(QueueSession { id })
    }

    fn fetch_batch(&self, session: &QueueSession) -> stationdeck::Result<Vec<Track>> {
        let request = self
            .client
            .inner()
            .post(self.url("/api/v2/playback/streams"))
            .json(&json!({
                "hostName": IHEART_HOST_NAME,
                "playedFrom": 1,
                "stationId": session.id,
                "stationType": "RADIO",
            }));
        let response: StreamsResponse = self.client.send_json(request)?;
        let total = response.items.len();
        let tracks: Vec<Track> = response
            .items
            .into_iter()
            .filter_map(track_from_item)
            .collect();
        if tracks.len() < total {
            warn!(dropped = total - tracks.len(), "batch items without stream or content");
        }
        Ok(tracks)
    }

    fn fetch_live_metadata(&self, station_id: &str) -> stationdeck::Result<LiveMetadata> {
        let url = self.url(&format!(
            "/api/v3/live-meta/stream/{}/currentTrackMeta",
            station_id
        ));
        let resp = self.client.inner().get(url).send()?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(LiveMetadata::default());
        }
        if !resp.status().is_success() {
            return Err(DeckError::Remote(format!("HTTP {}", resp.status())));
        }
        let value: Value = resp.json()?;
        Ok(live_metadata_from(&value))
    }

    fn resolve_live_stream(&self, station_id: &str) -> stationdeck::Result<String> {
        let response: LiveStationsResponse = self
            .client
            .get_json(&self.url(&format!("/api/v2/content/liveStations/{}", station_id)))?;
        let locator = response.into_locator()?;
        debug!(station_id, locator = locator.as_str(), "resolved live station");
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_JSON: &str = r#"{
        "results": {
            "stations": [
                {"id": 1469, "name": "Z100", "description": "New York's Hit Music Station",
                 "callLetters": "WHTZ-FM", "frequency": "100.3"},
                {"id": null, "name": "Broken"}
            ],
            "artists": [{"id": 30276, "name": "Radiohead", "image": "x"}],
            "tracks": [
                {"id": 123, "title": "Karma Police", "artistId": 30276, "artistName": "Radiohead"},
                {"id": "124", "title": "Unknown"}
            ]
        }
    }"#;

    fn search(category: SearchCategory) -> Vec<SearchHit> {
        let response: SearchResponse = serde_json::from_str(SEARCH_JSON).unwrap();
        response.results.into_hits(category)
    }

    #[test]
    fn numeric_and_string_ids() {
        assert_eq!(id_string(&json!(42)), Some("42".to_string()));
        assert_eq!(id_string(&json!("abc")), Some("abc".to_string()));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&Value::Null), None);
    }

    #[test]
    fn station_hits_carry_frequency() {
        let hits = search(SearchCategory::Stations);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1469");
        assert_eq!(
            hits[0].description.as_deref(),
            Some("New York's Hit Music Station at 100.3")
        );
        assert!(hits[0].locator.is_none());
    }

    #[test]
    fn artist_hits() {
        let hits = search(SearchCategory::Artists);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Radiohead");
        assert_eq!(hits[0].category, SearchCategory::Artists);
    }

    #[test]
    fn track_hits_name_and_seed_artist() {
        let hits = search(SearchCategory::Tracks);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "Karma Police - Radiohead");
        assert_eq!(hits[0].artist_id.as_deref(), Some("30276"));
        assert_eq!(hits[1].name, "Unknown");
        assert_eq!(hits[1].artist_id, None);
    }

    #[test]
    fn empty_results_object() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.results.into_hits(SearchCategory::Artists).is_empty());
    }

    #[test]
    fn stream_items_become_tracks() {
        let json = r#"{"items": [
            {"streamUrl": "https://s/1.m4a", "content": {
                "id": 9, "title": "Creep", "version": "Acoustic", "duration": 238,
                "artistName": "Radiohead", "artistId": 30276, "albumName": "Pablo Honey",
                "albumId": 77, "imagePath": "https://img/1"}},
            {"streamUrl": "", "content": {"id": 10, "title": "No stream"}},
            {"streamUrl": "https://s/2.m4a"}
        ]}"#;
        let response: StreamsResponse = serde_json::from_str(json).unwrap();
        let tracks: Vec<Track> = response
            .items
            .into_iter()
            .filter_map(track_from_item)
            .collect();

        assert_eq!(tracks.len(), 1);
        let t = &tracks[0];
        assert_eq!(t.id, "9");
        assert_eq!(t.locator, "https://s/1.m4a");
        assert_eq!(t.artist, "Radiohead");
        assert_eq!(t.album, "Pablo Honey");
        assert_eq!(t.version.as_deref(), Some("Acoustic"));
        assert_eq!(t.duration_secs, 238);
        assert_eq!(t.artist_id.as_deref(), Some("30276"));
        assert_eq!(t.album_id.as_deref(), Some("77"));
        let raw = t.raw.as_ref().unwrap();
        assert_eq!(raw["content"]["imagePath"], "https://img/1");
    }

    #[test]
    fn live_station_prefers_hls() {
        let json = r#"{"hits": [{"streams": {
            "shoutcast_stream": "http://sc",
            "hls_stream": "https://hls/master.m3u8",
            "bitrate": 128
        }}]}"#;
        let response: LiveStationsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_locator().unwrap(), "https://hls/master.m3u8");
    }

    #[test]
    fn unknown_live_station() {
        let response: LiveStationsResponse = serde_json::from_str(r#"{"hits": []}"#).unwrap();
        assert!(matches!(
            response.into_locator(),
            Err(DeckError::StreamUnavailable(_))
        ));
    }

    #[test]
    fn live_metadata_flat_or_wrapped() {
        let flat = json!({"title": "Song", "artist": "Band", "album": ""});
        let meta = live_metadata_from(&flat);
        assert_eq!(meta.title.as_deref(), Some("Song"));
        assert_eq!(meta.artist.as_deref(), Some("Band"));
        assert_eq!(meta.album, None);

        let wrapped = json!({"data": {"title": "Other", "artistName": "Act"}});
        let meta = live_metadata_from(&wrapped);
        assert_eq!(meta.title.as_deref(), Some("Other"));
        assert_eq!(meta.artist.as_deref(), Some("Act"));
    }

    #[test]
    fn artist_station_error_is_reported() {
        let response: ArtistStationResponse =
            serde_json::from_str(r#"{"error": "not found"}"#).unwrap();
        assert!(response.error.is_some());
        assert!(response.id.is_none());
    }
}
