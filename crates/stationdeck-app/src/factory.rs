//! Station factory
//!
//! Turns search hits and persisted descriptors into playable stations bound
//! to the shared engine.

use std::sync::Arc;

use stationdeck::catalog::{CatalogClient, SearchCategory, SearchHit};
use stationdeck::engine::PlaybackEngine;
use stationdeck::error::DeckError;
use stationdeck::source::{PlaylistSequencer, RemoteQueueSource};
use stationdeck::station::{
    ContinuousStation, LocatorSource, QueueStation, Station, StationDescriptor,
};
use stationdeck::store::{PlaylistRecord, Store};
use tracing::debug;

use crate::config::providers::{RELAY_ID, RELAY_NAME, RELAY_URL};
use crate::error::{AppError, Result};

pub struct StationFactory {
    engine: Arc<PlaybackEngine>,
    catalog: Arc<dyn CatalogClient>,
    user_id: String,
    store: Arc<dyn Store>,
}

impl StationFactory {
    pub fn new(
        engine: Arc<PlaybackEngine>,
        catalog: Arc<dyn CatalogClient>,
        user_id: impl Into<String>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            engine,
            catalog,
            user_id: user_id.into(),
            store,
        }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogClient> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    /// The built-in relay station
    pub fn relay() -> StationDescriptor {
        StationDescriptor::Relay {
            id: RELAY_ID.to_string(),
            name: RELAY_NAME.to_string(),
            locator: RELAY_URL.to_string(),
        }
    }

    /// Descriptor for a chosen search hit.
    ///
    /// Hits with a locator are directory stations. Track hits need a seed
    /// artist to become song radio.
    pub fn descriptor_for(hit: &SearchHit) -> Result<StationDescriptor> {
        if let Some(ref locator) = hit.locator {
            return Ok(StationDescriptor::Internet {
                id: hit.id.clone(),
                name: hit.name.clone(),
                locator: locator.clone(),
            });
        }
        Ok(match hit.category {
            SearchCategory::Stations => StationDescriptor::Live {
                id: hit.id.clone(),
                name: hit.name.clone(),
                description: hit.description.clone(),
            },
            SearchCategory::Artists => StationDescriptor::Artist {
                id: hit.id.clone(),
                name: hit.name.clone(),
            },
            SearchCategory::Tracks => {
                let artist_id = hit.artist_id.clone().ok_or_else(|| {
                    DeckError::InvalidChoice(format!("{} has no artist to seed radio", hit.name))
                })?;
                StationDescriptor::Song {
                    id: hit.id.clone(),
                    artist_id,
                    name: hit.name.clone(),
                }
            }
        })
    }

    /// Build a station for `descriptor`. Nothing starts playing yet.
    pub fn build(&self, descriptor: &StationDescriptor) -> Result<Box<dyn Station>> {
        debug!(station = %descriptor, "building station");
        let engine = self.engine.clone();
        let station: Box<dyn Station> = match descriptor {
            StationDescriptor::Relay { locator, .. } | StationDescriptor::Internet { locator, .. } => {
                Box::new(
                    ContinuousStation::new(
                        engine,
                        descriptor.clone(),
                        LocatorSource::Fixed(locator.clone()),
                    )
                    .seekable(false),
                )
            }
            StationDescriptor::Live { id, .. } => Box::new(ContinuousStation::new(
                engine,
                descriptor.clone(),
                LocatorSource::Catalog {
                    catalog: self.catalog.clone(),
                    station_id: id.clone(),
                },
            )),
            StationDescriptor::Artist { id, .. } => Box::new(QueueStation::new(
                engine,
                descriptor.clone(),
                RemoteQueueSource::new(self.catalog.clone(), self.user_id.clone(), id.clone()),
            )),
            StationDescriptor::Song { artist_id, .. } => Box::new(QueueStation::new(
                engine,
                descriptor.clone(),
                RemoteQueueSource::new(
                    self.catalog.clone(),
                    self.user_id.clone(),
                    artist_id.clone(),
                ),
            )),
            StationDescriptor::Playlist { name, shuffle } => {
                let mut sequencer = PlaylistSequencer::from_record(self.playlist(name)?);
                if *shuffle {
                    sequencer.toggle_shuffle();
                }
                Box::new(QueueStation::new(engine, descriptor.clone(), sequencer))
            }
        };
        Ok(station)
    }

    /// Stored playlist by name
    pub fn playlist(&self, name: &str) -> Result<PlaylistRecord> {
        self.store
            .load_playlists()?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| AppError::NotFound(format!("playlist {}", name)))
    }

    pub fn playlist_names(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .load_playlists()?
            .into_iter()
            .map(|p| p.name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use stationdeck::catalog::{LiveMetadata, QueueSession};
    use stationdeck::engine::{EventSender, HandleId, OutputHandle, Player};
    use stationdeck::station::StationKind;
    use stationdeck::Track;

    struct SilentHandle;

    impl OutputHandle for SilentHandle {
        fn play(&mut self) -> stationdeck::Result<()> {
            Ok(())
        }
        fn stop(&mut self) {}
        fn is_playing(&self) -> bool {
            false
        }
        fn set_paused(&mut self, _paused: bool) {}
        fn seek(&mut self, _delta_ms: i64) {}
    }

    struct SilentPlayer;

    impl Player for SilentPlayer {
        fn open(
            &self,
            _locator: &str,
            _id: HandleId,
            _events: EventSender,
        ) -> stationdeck::Result<Box<dyn OutputHandle>> {
            Ok(Box::new(SilentHandle))
        }
    }

    struct NoCatalog;

    impl CatalogClient for NoCatalog {
        fn search(
            &self,
            _keyword: &str,
            _category: SearchCategory,
            _offset: usize,
        ) -> stationdeck::Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }
        fn resolve_queue_session(
            &self,
            _user_id: &str,
            _source_id: &str,
        ) -> stationdeck::Result<QueueSession> {
            Err(DeckError::Remote("offline".to_string()))
        }
        fn fetch_batch(&self, _session: &QueueSession) -> stationdeck::Result<Vec<Track>> {
            Ok(Vec::new())
        }
        fn fetch_live_metadata(&self, _station_id: &str) -> stationdeck::Result<LiveMetadata> {
            Ok(LiveMetadata::default())
        }
        fn resolve_live_stream(&self, _station_id: &str) -> stationdeck::Result<String> {
            Err(DeckError::StreamUnavailable("offline".to_string()))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        playlists: Mutex<Vec<PlaylistRecord>>,
    }

    impl Store for MemoryStore {
        fn load_playlists(&self) -> stationdeck::Result<Vec<PlaylistRecord>> {
            Ok(self.playlists.lock().unwrap().clone())
        }
        fn write_playlists(&self, playlists: &[PlaylistRecord]) -> stationdeck::Result<()> {
            let mut stored = self.playlists.lock().unwrap();
            for pl in playlists {
                stored.retain(|p| p.name != pl.name);
                stored.push(pl.clone());
            }
            Ok(())
        }
        fn load_last_played(&self) -> stationdeck::Result<Option<StationDescriptor>> {
            Ok(None)
        }
        fn write_last_played(&self, _station: &StationDescriptor) -> stationdeck::Result<()> {
            Ok(())
        }
    }

    fn factory() -> StationFactory {
        let engine = Arc::new(PlaybackEngine::new(Box::new(SilentPlayer)).unwrap());
        let store = MemoryStore::default();
        let mut mix = PlaylistRecord::new("mix");
        for id in ["a", "b", "c"] {
            mix.add(Track::new(id, id.to_uppercase(), format!("http://t/{}", id)));
        }
        store.write_playlists(&[mix]).unwrap();
        StationFactory::new(engine, Arc::new(NoCatalog), "user-1", Arc::new(store))
    }

    fn hit(category: SearchCategory) -> SearchHit {
        SearchHit {
            id: "7".to_string(),
            name: "Seven".to_string(),
            category,
            description: None,
            artist_id: None,
            locator: None,
        }
    }

    #[test]
    fn hits_map_to_descriptors() {
        let live = StationFactory::descriptor_for(&hit(SearchCategory::Stations)).unwrap();
        assert_eq!(live.kind(), StationKind::Live);

        let artist = StationFactory::descriptor_for(&hit(SearchCategory::Artists)).unwrap();
        assert_eq!(artist.kind(), StationKind::Artist);

        let mut track = hit(SearchCategory::Tracks);
        track.artist_id = Some("99".to_string());
        match StationFactory::descriptor_for(&track).unwrap() {
            StationDescriptor::Song { id, artist_id, .. } => {
                assert_eq!(id, "7");
                assert_eq!(artist_id, "99");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn track_without_artist_is_invalid() {
        let err = StationFactory::descriptor_for(&hit(SearchCategory::Tracks)).unwrap_err();
        assert!(matches!(err, AppError::Engine(DeckError::InvalidChoice(_))));
    }

    #[test]
    fn hit_with_locator_is_internet_station() {
        let mut h = hit(SearchCategory::Stations);
        h.locator = Some("http://stream".to_string());
        let desc = StationFactory::descriptor_for(&h).unwrap();
        assert_eq!(desc.kind(), StationKind::Internet);
    }

    #[test]
    fn builds_each_kind() {
        let f = factory();
        let descriptors = [
            StationFactory::relay(),
            StationFactory::descriptor_for(&hit(SearchCategory::Stations)).unwrap(),
            StationFactory::descriptor_for(&hit(SearchCategory::Artists)).unwrap(),
            StationDescriptor::Playlist {
                name: "mix".to_string(),
                shuffle: false,
            },
        ];
        for desc in descriptors {
            let station = f.build(&desc).unwrap();
            assert_eq!(station.kind(), desc.kind());
            assert_eq!(station.name(), desc.name());
            assert_eq!(station.kind().is_queue(), station.as_queue().is_some());
        }
    }

    #[test]
    fn relay_has_fixed_locator() {
        let station = factory().build(&StationFactory::relay()).unwrap();
        assert_eq!(station.locator().as_deref(), Some(RELAY_URL));
        assert!(station.as_playlist().is_none());
    }

    #[test]
    fn shuffled_playlist_keeps_flag() {
        let station = factory()
            .build(&StationDescriptor::Playlist {
                name: "mix".to_string(),
                shuffle: true,
            })
            .unwrap();
        let controls = station.as_playlist().unwrap();
        assert!(controls.is_shuffled());
        assert_eq!(controls.tracks().len(), 3);
    }

    #[test]
    fn missing_playlist_is_not_found() {
        let err = factory()
            .build(&StationDescriptor::Playlist {
                name: "nope".to_string(),
                shuffle: false,
            })
            .err()
            .unwrap();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn lists_playlist_names() {
        assert_eq!(factory().playlist_names().unwrap(), vec!["mix".to_string()]);
    }
}
