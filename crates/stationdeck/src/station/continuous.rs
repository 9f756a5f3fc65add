//! Continuous stations
//!
//! One persistent stream. Pausing a live stream means stopping it; resuming
//! re-resolves the locator and starts over.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::catalog::{CatalogClient, LiveMetadata};
use crate::config::engine::SEEK_STEP_MS;
use crate::engine::PlaybackEngine;
use crate::error::Result;

use super::{Station, StationDescriptor, StationInfo, StationKind};

/// Where a continuous station gets its locator from
pub enum LocatorSource {
    /// A locator known up front (relay, directory station)
    Fixed(String),
    /// A catalog live station, resolved on every play
    Catalog {
        catalog: Arc<dyn CatalogClient>,
        station_id: String,
    },
}

pub struct ContinuousStation {
    engine: Arc<PlaybackEngine>,
    descriptor: StationDescriptor,
    source: LocatorSource,
    seekable: bool,
    locator: Mutex<Option<String>>,
}

impl ContinuousStation {
    pub fn new(
        engine: Arc<PlaybackEngine>,
        descriptor: StationDescriptor,
        source: LocatorSource,
    ) -> Self {
        let locator = match source {
            LocatorSource::Fixed(ref locator) => Some(locator.clone()),
            LocatorSource::Catalog { .. } => None,
        };
        Self {
            engine,
            descriptor,
            source,
            seekable: false,
            locator: Mutex::new(locator),
        }
    }

    /// Builder: allow forward/rewind to seek within the stream
    pub fn seekable(mut self, seekable: bool) -> Self {
        self.seekable = seekable;
        self
    }

    fn resolve(&self) -> Result<String> {
        let locator = match self.source {
            LocatorSource::Fixed(ref locator) => locator.clone(),
            LocatorSource::Catalog {
                ref catalog,
                ref station_id,
            } => catalog.resolve_live_stream(station_id)?,
        };
        if let Ok(mut current) = self.locator.lock() {
            *current = Some(locator.clone());
        }
        Ok(locator)
    }

    /// Whether the engine is currently bound to this station's stream
    fn owns_engine(&self) -> bool {
        let ours = self.locator();
        ours.is_some() && self.engine.current_locator() == ours
    }

    fn seek(&self, delta_ms: i64) {
        if self.seekable && self.owns_engine() {
            self.engine.seek_relative(delta_ms);
        }
    }
}

impl Station for ContinuousStation {
    fn id(&self) -> &str {
        self.descriptor.id()
    }

    fn name(&self) -> &str {
        self.descriptor.name()
    }

    fn kind(&self) -> StationKind {
        self.descriptor.kind()
    }

    fn locator(&self) -> Option<String> {
        self.locator.lock().ok().and_then(|l| l.clone())
    }

    fn play(&self) -> Result<()> {
        if self.is_playing() {
            return Ok(());
        }
        let locator = self.resolve()?;
        debug!(station = self.name(), locator = locator.as_str(), "resolved");
        self.engine.load(&locator)?;
        if let Err(e) = self.engine.start() {
            // Don't leave a half-open handle behind
            self.stop();
            return Err(e);
        }
        info!(station = self.name(), "live");
        Ok(())
    }

    fn stop(&self) {
        if self.owns_engine() {
            self.engine.stop();
        }
    }

    fn toggle_pause(&self, pause: bool) -> Result<bool> {
        if pause && self.is_playing() {
            self.stop();
        } else if !self.is_playing() {
            self.play()?;
        }
        Ok(self.is_playing())
    }

    fn is_playing(&self) -> bool {
        self.owns_engine() && self.engine.is_playing()
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn forward(&self) -> Result<()> {
        self.seek(SEEK_STEP_MS);
        Ok(())
    }

    fn rewind(&self) -> Result<()> {
        self.seek(-SEEK_STEP_MS);
        Ok(())
    }

    fn info(&self) -> Option<StationInfo> {
        if let LocatorSource::Catalog {
            ref catalog,
            ref station_id,
        } = self.source
        {
            match catalog.fetch_live_metadata(station_id) {
                Ok(meta) if !meta.is_empty() => return Some(StationInfo::Live(meta)),
                Ok(_) => {}
                Err(e) => debug!(station = self.name(), "no live metadata: {}", e),
            }
        }
        if !self.owns_engine() {
            return None;
        }
        self.engine.metadata().map(|meta| {
            StationInfo::Live(LiveMetadata {
                title: meta.title,
                artist: meta.artist,
                album: None,
            })
        })
    }

    fn descriptor(&self) -> StationDescriptor {
        self.descriptor.clone()
    }
}
