//! Stationdeck: stations, track sources and the playback engine
//!
//! A station turns a catalog entry into sound: a continuous station keeps one
//! locator playing, a queue station pulls tracks from a `TrackSource` and
//! advances on end of media. Both drive a `PlaybackEngine` that owns exactly
//! one output handle at a time.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use stationdeck::audio::RodioPlayer;
//! use stationdeck::engine::PlaybackEngine;
//! use stationdeck::station::{ContinuousStation, LocatorSource, Station, StationDescriptor};
//!
//! # fn main() -> stationdeck::Result<()> {
//! let engine = Arc::new(PlaybackEngine::new(Box::new(RodioPlayer::new()?))?);
//! let locator = "http://anonradio.net:8000/anonradio".to_string();
//! let station = ContinuousStation::new(
//!     engine,
//!     StationDescriptor::Relay {
//!         id: "anonradio".to_string(),
//!         name: "aNONradio".to_string(),
//!         locator: locator.clone(),
//!     },
//!     LocatorSource::Fixed(locator),
//! );
//! station.play()?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod backoff;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod source;
pub mod station;
pub mod store;
pub mod stream;
pub mod track;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DeckError, Result};
pub use track::Track;
