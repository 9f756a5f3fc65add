//! Stations
//!
//! The unit the control loop drives. Two shapes share one interface:
//! [`ContinuousStation`] plays a single persistent stream, [`QueueStation`]
//! plays discrete tracks pulled from a [`TrackSource`](crate::source::TrackSource).

mod continuous;
mod queue;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::LiveMetadata;
use crate::error::Result;
use crate::store::PlaylistRecord;
use crate::track::Track;

pub use continuous::{ContinuousStation, LocatorSource};
pub use queue::{QueueStation, TrackObserver};

/// Station variants, for presentation-level decisions such as key bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationKind {
    /// Fixed internet relay
    Relay,
    /// Catalog live station
    Live,
    /// Directory (Radio Browser) station
    Internet,
    /// Artist radio
    Artist,
    /// Song radio, seeded by a track's artist
    Song,
    /// Local playlist
    Playlist,
}

impl StationKind {
    /// Whether the station plays discrete tracks
    pub fn is_queue(&self) -> bool {
        matches!(
            self,
            StationKind::Artist | StationKind::Song | StationKind::Playlist
        )
    }
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StationKind::Relay => "Relay",
            StationKind::Live => "Live",
            StationKind::Internet => "Internet",
            StationKind::Artist => "Artist Radio",
            StationKind::Song => "Song Radio",
            StationKind::Playlist => "Playlist",
        };
        f.write_str(label)
    }
}

/// Everything needed to rebuild a station, as persisted for "last played"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StationDescriptor {
    Relay {
        id: String,
        name: String,
        locator: String,
    },
    Live {
        id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Internet {
        id: String,
        name: String,
        locator: String,
    },
    Artist {
        id: String,
        name: String,
    },
    Song {
        id: String,
        artist_id: String,
        name: String,
    },
    Playlist {
        name: String,
        #[serde(default)]
        shuffle: bool,
    },
}

impl StationDescriptor {
    pub fn kind(&self) -> StationKind {
        match self {
            StationDescriptor::Relay { .. } => StationKind::Relay,
            StationDescriptor::Live { .. } => StationKind::Live,
            StationDescriptor::Internet { .. } => StationKind::Internet,
            StationDescriptor::Artist { .. } => StationKind::Artist,
            StationDescriptor::Song { .. } => StationKind::Song,
            StationDescriptor::Playlist { .. } => StationKind::Playlist,
        }
    }

    /// Stable id within the station's source. Playlists are keyed by name.
    pub fn id(&self) -> &str {
        match self {
            StationDescriptor::Relay { id, .. }
            | StationDescriptor::Live { id, .. }
            | StationDescriptor::Internet { id, .. }
            | StationDescriptor::Artist { id, .. }
            | StationDescriptor::Song { id, .. } => id,
            StationDescriptor::Playlist { name, .. } => name,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            StationDescriptor::Relay { name, .. }
            | StationDescriptor::Live { name, .. }
            | StationDescriptor::Internet { name, .. }
            | StationDescriptor::Artist { name, .. }
            | StationDescriptor::Song { name, .. }
            | StationDescriptor::Playlist { name, .. } => name,
        }
    }
}

impl fmt::Display for StationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationDescriptor::Live {
                name,
                description: Some(desc),
                ..
            } if !desc.is_empty() => write!(f, "{} ({})", name, desc),
            other => write!(f, "{} [{}]", other.name(), other.kind()),
        }
    }
}

/// Best-effort "now playing" data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationInfo {
    Track(Track),
    Live(LiveMetadata),
}

impl fmt::Display for StationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationInfo::Track(track) => track.fmt(f),
            StationInfo::Live(meta) => meta.fmt(f),
        }
    }
}

/// Position within the current track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub elapsed: Duration,
    pub total: Duration,
}

impl Progress {
    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.elapsed)
    }
}

/// A playable station
pub trait Station: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn kind(&self) -> StationKind;

    /// Locator currently bound to the station, if any
    fn locator(&self) -> Option<String>;

    /// Start playback. Errors from resolving or starting propagate.
    fn play(&self) -> Result<()>;

    /// Unsubscribe from engine events, then stop the engine
    fn stop(&self);

    /// Pause or resume. Returns whether the station is playing afterwards.
    fn toggle_pause(&self, pause: bool) -> Result<bool>;

    fn is_playing(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Skip ahead. No-op where the station has nothing to skip to.
    fn forward(&self) -> Result<()>;

    fn rewind(&self) -> Result<()>;

    fn info(&self) -> Option<StationInfo>;

    fn descriptor(&self) -> StationDescriptor;

    fn progress(&self) -> Option<Progress> {
        None
    }

    fn as_queue(&self) -> Option<&dyn QueueControls> {
        None
    }

    fn as_playlist(&self) -> Option<&dyn PlaylistControls> {
        None
    }
}

/// Controls available on track-based stations
pub trait QueueControls {
    /// Flip repeat. Returns the new state.
    fn toggle_repeat(&self) -> bool;

    fn is_repeat(&self) -> bool;

    fn current_track(&self) -> Option<Track>;

    /// Register an observer called each time a new track starts playing
    fn on_track_change(&self, observer: TrackObserver);
}

/// Controls available on local playlist stations
pub trait PlaylistControls {
    /// Play the track at canonical `index` now
    fn jump_to(&self, index: usize) -> Result<()>;

    /// Flip shuffle. Returns the new state.
    fn toggle_shuffle(&self) -> bool;

    fn is_shuffled(&self) -> bool;

    /// Remove a track from future rotation. Returns whether it was present.
    fn remove_track(&self, track_id: &str) -> bool;

    fn add_track(&self, track: Track) -> bool;

    /// Tracks in stored order
    fn tracks(&self) -> Vec<Track>;

    /// Tracks in upcoming play order
    fn upcoming(&self) -> Vec<Track>;

    fn export(&self) -> PlaylistRecord;
}
