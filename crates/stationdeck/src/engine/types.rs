//! Playback engine types
//!
//! Events, handle identities, and the `Player`/`OutputHandle` capability
//! the engine drives.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::error::Result;
use crate::stream::metadata::StreamMetadata;

/// Identity of one output handle. Strictly increasing per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Event kinds a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PositionChanged,
    StreamEnded,
}

/// Events emitted by an output handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Playback position of the handle, excluding time spent paused
    PositionChanged { elapsed: Duration },
    /// The handle reached the end of its media
    StreamEnded,
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlayerEvent::PositionChanged { .. } => EventKind::PositionChanged,
            PlayerEvent::StreamEnded => EventKind::StreamEnded,
        }
    }
}

/// A player event tagged with the handle that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub handle: HandleId,
    pub event: PlayerEvent,
}

/// Channel on which handles publish their events
pub type EventSender = Sender<EngineEvent>;

/// Media decode/output backend
pub trait Player: Send + Sync {
    /// Open `locator` into a new, not yet started handle.
    ///
    /// Must return promptly; slow work (network, probing) belongs to the
    /// handle's own threads and surfaces through `is_playing`/`failure`.
    fn open(
        &self,
        locator: &str,
        id: HandleId,
        events: EventSender,
    ) -> Result<Box<dyn OutputHandle>>;
}

/// One live output bound to a single locator. Dropping it releases it.
pub trait OutputHandle: Send {
    /// Request playback. Audio may begin later, once the media is ready.
    fn play(&mut self) -> Result<()>;

    fn stop(&mut self);

    fn is_playing(&self) -> bool;

    fn set_paused(&mut self, paused: bool);

    /// Seek relative to the current position; negative values rewind
    fn seek(&mut self, delta_ms: i64);

    /// Latest in-band metadata (ICY `StreamTitle`), if the stream carries any
    fn metadata(&self) -> Option<StreamMetadata> {
        None
    }

    /// Terminal open/decode failure, if one occurred
    fn failure(&self) -> Option<String> {
        None
    }
}
