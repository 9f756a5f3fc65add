//! Remote catalog capability
//!
//! Search, queue sessions for artist/song radio, and live station lookups.
//! Implemented by providers in the app crate; mocked in tests.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DeckError, Result};
use crate::track::Track;

/// What a search should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchCategory {
    /// Live radio stations
    Stations,
    /// Artists, played as artist radio
    Artists,
    /// Tracks, played as song radio seeded by the track's artist
    Tracks,
}

impl SearchCategory {
    /// Key used by the catalog's search response
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchCategory::Stations => "stations",
            SearchCategory::Artists => "artists",
            SearchCategory::Tracks => "tracks",
        }
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub category: SearchCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Seed artist for song radio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    /// Direct stream locator, when the provider already knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description.as_deref() {
            Some(desc) if !desc.is_empty() => write!(f, "{} ({})", self.name, desc),
            _ => f.write_str(&self.name),
        }
    }
}

/// Handle to a server-side generated track queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSession {
    pub id: String,
}

/// Best-effort "now playing" data for a live stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl LiveMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.album.is_none()
    }
}

impl fmt::Display for LiveMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.title, &self.artist) {
            (Some(t), Some(a)) => write!(f, "\"{}\" by {}", t, a)?,
            (Some(t), None) => write!(f, "\"{}\"", t)?,
            (None, Some(a)) => write!(f, "{}", a)?,
            (None, None) => write!(f, "---")?,
        }
        if let Some(ref album) = self.album {
            write!(f, " on \"{}\"", album)?;
        }
        Ok(())
    }
}

/// Remote catalog/search service
pub trait CatalogClient: Send + Sync {
    /// Search the catalog; `offset` pages through results
    fn search(&self, keyword: &str, category: SearchCategory, offset: usize)
        -> Result<Vec<SearchHit>>;

    /// Open a queue session for an artist (or song-seeded artist) radio
    fn resolve_queue_session(&self, user_id: &str, source_id: &str) -> Result<QueueSession>;

    /// Fetch the next batch of tracks for a session
    fn fetch_batch(&self, session: &QueueSession) -> Result<Vec<Track>>;

    fn fetch_live_metadata(&self, station_id: &str) -> Result<LiveMetadata>;

    /// Resolve a live station id to its preferred stream locator
    fn resolve_live_stream(&self, station_id: &str) -> Result<String>;
}

/// Stream keys in order of preference
const STREAM_PREFERENCE: [&str; 3] = ["hls_stream", "secure_shoutcast_stream", "secure_pls_stream"];

/// Pick the preferred locator from a live station's stream map.
///
/// HLS first, then secure shoutcast, then secure PLS, then any non-empty value.
pub fn preferred_stream(streams: &BTreeMap<String, String>) -> Result<String> {
    STREAM_PREFERENCE
        .iter()
        .filter_map(|key| streams.get(*key))
        .chain(streams.values())
        .map(|url| url.trim())
        .find(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DeckError::StreamUnavailable("station has no streams".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streams(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn prefers_hls() {
        let map = streams(&[
            ("secure_pls_stream", "https://a/pls"),
            ("hls_stream", " https://a/live.m3u8 "),
            ("secure_shoutcast_stream", "https://a/sc"),
        ]);
        assert_eq!(preferred_stream(&map).unwrap(), "https://a/live.m3u8");
    }

    #[test]
    fn falls_back_to_shoutcast_then_pls() {
        let map = streams(&[
            ("secure_pls_stream", "https://a/pls"),
            ("secure_shoutcast_stream", "https://a/sc"),
        ]);
        assert_eq!(preferred_stream(&map).unwrap(), "https://a/sc");

        let map = streams(&[("secure_pls_stream", "https://a/pls"), ("pls_stream", "x")]);
        assert_eq!(preferred_stream(&map).unwrap(), "https://a/pls");
    }

    #[test]
    fn falls_back_to_any_value() {
        let map = streams(&[("shoutcast_stream", "http://a/sc")]);
        assert_eq!(preferred_stream(&map).unwrap(), "http://a/sc");
    }

    #[test]
    fn skips_empty_preferred_entry() {
        let map = streams(&[("hls_stream", "  "), ("stw_stream", "http://a/stw")]);
        assert_eq!(preferred_stream(&map).unwrap(), "http://a/stw");
    }

    #[test]
    fn empty_map_is_unavailable() {
        let err = preferred_stream(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, DeckError::StreamUnavailable(_)));
    }

    #[test]
    fn live_metadata_display() {
        let meta = LiveMetadata {
            title: Some("Song".to_string()),
            artist: Some("Band".to_string()),
            album: None,
        };
        assert_eq!(meta.to_string(), "\"Song\" by Band");
        assert_eq!(LiveMetadata::default().to_string(), "---");
        assert!(LiveMetadata::default().is_empty());
    }

    #[test]
    fn search_hit_display_with_description() {
        let hit = SearchHit {
            id: "1".to_string(),
            name: "KISS FM".to_string(),
            category: SearchCategory::Stations,
            description: Some("Hit music".to_string()),
            artist_id: None,
            locator: None,
        };
        assert_eq!(hit.to_string(), "KISS FM (Hit music)");
    }
}
