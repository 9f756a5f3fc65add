//! Track type
//!
//! One playable item of a queue station. Immutable once built.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A discrete, playable track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog id, unique within a playlist
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Edition label such as "Live" or "Remastered"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    #[serde(default)]
    pub duration_secs: u32,
    /// Media locator handed to the playback engine
    pub locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Catalog record the track was built from, written back untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Track {
    /// Create a track with only the required fields set
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            version: None,
            artist_id: None,
            album_id: None,
            duration_secs: 0,
            locator: locator.into(),
            image_url: None,
            raw: None,
        }
    }

    /// Builder: set artist and album
    pub fn with_credits(mut self, artist: impl Into<String>, album: impl Into<String>) -> Self {
        self.artist = artist.into();
        self.album = album.into();
        self
    }

    /// Builder: set duration in seconds
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Builder: keep the catalog record this track came from
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_secs))
    }

    /// Duration as `m:ss`
    pub fn duration_label(&self) -> String {
        format_clock(self.duration_secs as u64)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.title)?;
        if !self.artist.is_empty() {
            write!(f, " by {}", self.artist)?;
        }
        if !self.album.is_empty() {
            write!(f, " on \"{}\"", self.album)?;
        }
        if let Some(ref version) = self.version {
            write!(f, " [{}]", version)?;
        }
        write!(f, " ({})", self.duration_label())
    }
}

/// Format seconds as `m:ss`, or `h:mm:ss` past an hour
pub fn format_clock(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
