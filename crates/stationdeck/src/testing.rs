//! Scripted collaborators for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::backoff::Backoff;
use crate::catalog::{CatalogClient, LiveMetadata, QueueSession, SearchCategory, SearchHit};
use crate::engine::{
    EngineEvent, EngineOptions, EventSender, HandleId, OutputHandle, Player, PlayerEvent,
};
use crate::error::{DeckError, Result};
use crate::stream::metadata::StreamMetadata;
use crate::track::Track;

/// Engine timing short enough for tests
pub fn fast_options() -> EngineOptions {
    EngineOptions {
        start_timeout: Duration::from_millis(200),
        start_poll: Duration::from_millis(5),
        pause_settle: Duration::from_millis(1),
    }
}

/// Retry policy short enough for tests
pub fn fast_backoff() -> Backoff {
    Backoff::new(Duration::from_millis(1), Duration::from_millis(5))
}

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Track {id}"), format!("http://tracks/{id}.mp3"))
        .with_credits("Artist", "Album")
        .with_duration(180)
}

#[derive(Default)]
struct MockPlayerState {
    live: usize,
    max_live: usize,
    opened: Vec<String>,
    seeks: Vec<i64>,
    start_delay: Duration,
    never_plays: bool,
    failure: Option<String>,
    open_error: bool,
    metadata: Option<StreamMetadata>,
    events: Option<EventSender>,
}

/// Player that counts live handles and lets tests fire events by hand
#[derive(Clone, Default)]
pub struct MockPlayer {
    state: Arc<Mutex<MockPlayerState>>,
}

impl MockPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockPlayerState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    pub fn live_handles(&self) -> usize {
        self.with(|s| s.live)
    }

    pub fn max_live_handles(&self) -> usize {
        self.with(|s| s.max_live)
    }

    /// Every locator opened so far, in order
    pub fn opened(&self) -> Vec<String> {
        self.with(|s| s.opened.clone())
    }

    pub fn seeks(&self) -> Vec<i64> {
        self.with(|s| s.seeks.clone())
    }

    pub fn set_start_delay(&self, delay: Duration) {
        self.with(|s| s.start_delay = delay);
    }

    pub fn set_never_plays(&self, never: bool) {
        self.with(|s| s.never_plays = never);
    }

    pub fn set_failure(&self, failure: Option<&str>) {
        self.with(|s| s.failure = failure.map(str::to_string));
    }

    pub fn set_open_error(&self, fail: bool) {
        self.with(|s| s.open_error = fail);
    }

    pub fn set_metadata(&self, metadata: Option<StreamMetadata>) {
        self.with(|s| s.metadata = metadata);
    }

    /// Publish an event as if the handle `id` had produced it
    pub fn emit(&self, id: HandleId, event: PlayerEvent) {
        if let Some(tx) = self.with(|s| s.events.clone()) {
            let _ = tx.send(EngineEvent { handle: id, event });
        }
    }
}

impl Player for MockPlayer {
    fn open(&self, locator: &str, _id: HandleId, events: EventSender) -> Result<Box<dyn OutputHandle>> {
        self.with(|s| {
            s.opened.push(locator.to_string());
            if s.open_error {
                return Err(DeckError::StreamUnavailable(locator.to_string()));
            }
            s.live += 1;
            s.max_live = s.max_live.max(s.live);
            s.events = Some(events);
            Ok(())
        })?;
        Ok(Box::new(MockHandle {
            player: self.clone(),
            started: None,
            paused: false,
            stopped: false,
        }))
    }
}

struct MockHandle {
    player: MockPlayer,
    started: Option<Instant>,
    paused: bool,
    stopped: bool,
}

impl OutputHandle for MockHandle {
    fn play(&mut self) -> Result<()> {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        self.paused = false;
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped = true;
    }

    fn is_playing(&self) -> bool {
        let (delay, never, failed) = self
            .player
            .with(|s| (s.start_delay, s.never_plays, s.failure.is_some()));
        match self.started {
            Some(at) => {
                !self.stopped && !self.paused && !never && !failed && at.elapsed() >= delay
            }
            None => false,
        }
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn seek(&mut self, delta_ms: i64) {
        self.player.with(|s| s.seeks.push(delta_ms));
    }

    fn metadata(&self) -> Option<StreamMetadata> {
        self.player.with(|s| s.metadata.clone())
    }

    fn failure(&self) -> Option<String> {
        self.player.with(|s| s.failure.clone())
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.player.with(|s| s.live = s.live.saturating_sub(1));
    }
}

/// Catalog producing numbered tracks, scripted to fail a number of times
#[derive(Default)]
pub struct MockCatalog {
    batch_size: usize,
    failures_left: AtomicU32,
    next_id: AtomicUsize,
    pub session_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub live_streams: Mutex<HashMap<String, String>>,
    pub live_metadata: Mutex<Option<LiveMetadata>>,
    pub hits: Mutex<Vec<SearchHit>>,
}

impl MockCatalog {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    /// Fail the next `n` session/batch calls with a remote error
    pub fn fail_times(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_live_stream(self, station_id: &str, locator: &str) -> Self {
        if let Ok(mut streams) = self.live_streams.lock() {
            streams.insert(station_id.to_string(), locator.to_string());
        }
        self
    }

    fn maybe_fail(&self) -> Result<()> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(DeckError::Remote("scripted failure".to_string()));
        }
        Ok(())
    }
}

impl CatalogClient for MockCatalog {
    fn search(&self, _keyword: &str, category: SearchCategory, offset: usize) -> Result<Vec<SearchHit>> {
        self.maybe_fail()?;
        let hits = self.hits.lock().map(|h| h.clone()).unwrap_or_default();
        Ok(hits
            .into_iter()
            .filter(|h| h.category == category)
            .skip(offset)
            .collect())
    }

    fn resolve_queue_session(&self, user_id: &str, source_id: &str) -> Result<QueueSession> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        Ok(QueueSession {
            id: format!("{user_id}:{source_id}"),
        })
    }

    fn fetch_batch(&self, _session: &QueueSession) -> Result<Vec<Track>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        Ok((0..self.batch_size)
            .map(|_| {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst);
                track(&format!("r{n}"))
            })
            .collect())
    }

    fn fetch_live_metadata(&self, _station_id: &str) -> Result<LiveMetadata> {
        self.live_metadata
            .lock()
            .ok()
            .and_then(|m| m.clone())
            .ok_or_else(|| DeckError::NotFound("no metadata".to_string()))
    }

    fn resolve_live_stream(&self, station_id: &str) -> Result<String> {
        self.live_streams
            .lock()
            .ok()
            .and_then(|s| s.get(station_id).cloned())
            .ok_or_else(|| DeckError::StreamUnavailable(station_id.to_string()))
    }
}
