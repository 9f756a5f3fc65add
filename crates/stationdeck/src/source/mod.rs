//! Track sources
//!
//! Producers of the next track for a queue station: a remote, catalog-driven
//! queue and a local playlist sequencer.

mod remote;
mod sequencer;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::Result;
use crate::track::Track;

pub use remote::RemoteQueueSource;
pub use sequencer::PlaylistSequencer;

/// Lazy, possibly infinite producer of tracks
pub trait TrackSource: Send + 'static {
    /// Produce the next track.
    ///
    /// May block while retrying; implementations that wait must give up with
    /// `Cancelled` once `stop` is set.
    fn next_track(&mut self, stop: &Arc<AtomicBool>) -> Result<Track>;

    /// Playlist controls, when this source is a local playlist
    fn as_sequencer(&mut self) -> Option<&mut PlaylistSequencer> {
        None
    }

    fn as_sequencer_ref(&self) -> Option<&PlaylistSequencer> {
        None
    }
}
