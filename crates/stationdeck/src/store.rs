//! Persistence capability
//!
//! Local playlists and the last-played station.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::station::StationDescriptor;
use crate::track::Track;

/// A named, ordered track collection as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl PlaylistRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    /// Append a track unless one with the same id is already present.
    /// Returns whether the track was added.
    pub fn add(&mut self, track: Track) -> bool {
        if self.contains(&track.id) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.iter().any(|t| t.id == track_id)
    }
}

/// Persistent playlists and last-played state
pub trait Store: Send + Sync {
    fn load_playlists(&self) -> Result<Vec<PlaylistRecord>>;

    /// Write every given playlist, replacing what is stored under the same names
    fn write_playlists(&self, playlists: &[PlaylistRecord]) -> Result<()>;

    fn load_last_played(&self) -> Result<Option<StationDescriptor>>;

    fn write_last_played(&self, station: &StationDescriptor) -> Result<()>;
}
