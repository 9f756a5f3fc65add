//! Playback engine
//!
//! Owns the single active output handle. Loading a new locator tears down the
//! previous handle before opening the next one. Handle events are delivered on
//! a dedicated `"engine-events"` thread; events from a handle that is no longer
//! current are dropped before dispatch.

pub mod types;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::config::engine::{PAUSE_SETTLE_MS, START_POLL_MS, START_TIMEOUT_SECS, TICK_MS};
use crate::error::{DeckError, Result};
use crate::stream::metadata::StreamMetadata;

pub use types::{
    EngineEvent, EventKind, EventSender, HandleId, OutputHandle, Player, PlayerEvent,
};

/// Listener registered for one event kind
pub type EventCallback = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

type Listeners = Arc<Mutex<HashMap<EventKind, EventCallback>>>;

/// Timing knobs for the engine
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub start_timeout: Duration,
    pub start_poll: Duration,
    pub pause_settle: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            start_timeout: Duration::from_secs(START_TIMEOUT_SECS),
            start_poll: Duration::from_millis(START_POLL_MS),
            pause_settle: Duration::from_millis(PAUSE_SETTLE_MS),
        }
    }
}

#[derive(Default)]
struct EngineState {
    handle: Option<Box<dyn OutputHandle>>,
    locator: Option<String>,
    generation: u64,
    paused: bool,
}

impl EngineState {
    /// Stop and release the current handle, invalidating its events
    fn release(&mut self, current: &AtomicU64) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
            drop(handle);
        }
        self.locator = None;
        self.paused = false;
        self.generation += 1;
        current.store(self.generation, Ordering::SeqCst);
    }
}

/// Single-handle playback engine shared by every station
pub struct PlaybackEngine {
    player: Box<dyn Player>,
    options: EngineOptions,
    state: Mutex<EngineState>,
    listeners: Listeners,
    current: Arc<AtomicU64>,
    event_tx: Sender<EngineEvent>,
    stop_flag: Arc<AtomicBool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackEngine {
    /// Create an engine with default timing
    pub fn new(player: Box<dyn Player>) -> Result<Self> {
        Self::with_options(player, EngineOptions::default())
    }

    /// Create an engine, spawning the event dispatcher thread
    pub fn with_options(player: Box<dyn Player>, options: EngineOptions) -> Result<Self> {
        let (event_tx, event_rx) = unbounded::<EngineEvent>();
        let listeners: Listeners = Arc::new(Mutex::new(HashMap::new()));
        let current = Arc::new(AtomicU64::new(0));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let listeners_thread = listeners.clone();
        let current_thread = current.clone();
        let stop_thread = stop_flag.clone();
        let dispatcher = thread::Builder::new()
            .name("engine-events".to_string())
            .spawn(move || {
                Self::dispatch(event_rx, listeners_thread, current_thread, stop_thread);
            })
            .map_err(|e| DeckError::Audio(format!("Failed to spawn event thread: {}", e)))?;

        Ok(Self {
            player,
            options,
            state: Mutex::new(EngineState::default()),
            listeners,
            current,
            event_tx,
            stop_flag,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    /// Bind the engine to `locator`.
    ///
    /// A no-op returning the existing handle when `locator` is already loaded.
    /// Otherwise the previous handle is stopped and released first.
    pub fn load(&self, locator: &str) -> Result<HandleId> {
        let mut state = self.lock_state();
        if state.handle.is_some() && state.locator.as_deref() == Some(locator) {
            return Ok(HandleId(state.generation));
        }

        state.release(&self.current);
        let id = HandleId(state.generation);
        debug!(%id, locator, "loading");

        let handle = self.player.open(locator, id, self.event_tx.clone())?;
        state.handle = Some(handle);
        state.locator = Some(locator.to_string());
        Ok(id)
    }

    /// Start the loaded handle and wait until it reports playing.
    ///
    /// Fails with `StartupTimeout` after the configured bound, with
    /// `StreamUnavailable` as soon as the backend reports a terminal failure,
    /// and with `Cancelled` if the handle is replaced or released meanwhile.
    pub fn start(&self) -> Result<()> {
        let (generation, locator) = {
            let mut state = self.lock_state();
            let generation = state.generation;
            let locator = state.locator.clone().unwrap_or_default();
            let handle = state
                .handle
                .as_mut()
                .ok_or_else(|| DeckError::StreamUnavailable("nothing loaded".to_string()))?;
            handle.play()?;
            state.paused = false;
            (generation, locator)
        };

        let started = Instant::now();
        loop {
            {
                let state = self.lock_state();
                let handle = match state.handle.as_ref() {
                    Some(h) if state.generation == generation => h,
                    _ => return Err(DeckError::Cancelled),
                };
                if handle.is_playing() {
                    info!(locator = locator.as_str(), "playing");
                    return Ok(());
                }
                if let Some(reason) = handle.failure() {
                    warn!(locator = locator.as_str(), %reason, "stream failed to open");
                    return Err(DeckError::StreamUnavailable(reason));
                }
            }
            if started.elapsed() >= self.options.start_timeout {
                warn!(locator = locator.as_str(), "startup timed out");
                return Err(DeckError::StartupTimeout {
                    locator,
                    secs: self.options.start_timeout.as_secs(),
                });
            }
            thread::sleep(self.options.start_poll);
        }
    }

    /// Pause or resume, then report whether the handle is playing after a
    /// short settle delay
    pub fn pause(&self, paused: bool) -> bool {
        {
            let mut state = self.lock_state();
            match state.handle.as_mut() {
                Some(handle) => handle.set_paused(paused),
                None => return false,
            }
            state.paused = paused;
        }
        thread::sleep(self.options.pause_settle);
        self.is_playing()
    }

    /// Release the current handle. No-op when nothing is loaded.
    pub fn stop(&self) {
        let mut state = self.lock_state();
        if state.handle.is_some() {
            debug!(locator = state.locator.as_deref().unwrap_or(""), "stopping");
            state.release(&self.current);
        }
    }

    pub fn is_playing(&self) -> bool {
        let state = self.lock_state();
        state.handle.as_ref().is_some_and(|h| h.is_playing())
    }

    pub fn is_paused(&self) -> bool {
        let state = self.lock_state();
        state.handle.is_some() && state.paused
    }

    /// Seek relative to the current position. No-op without a handle.
    pub fn seek_relative(&self, delta_ms: i64) {
        let mut state = self.lock_state();
        if let Some(handle) = state.handle.as_mut() {
            handle.seek(delta_ms);
        }
    }

    /// Locator of the current handle
    pub fn current_locator(&self) -> Option<String> {
        let state = self.lock_state();
        state.handle.as_ref().and(state.locator.clone())
    }

    /// Id of the current handle
    pub fn current_handle(&self) -> Option<HandleId> {
        let state = self.lock_state();
        state.handle.as_ref().map(|_| HandleId(state.generation))
    }

    /// In-band stream metadata from the current handle
    pub fn metadata(&self) -> Option<StreamMetadata> {
        let state = self.lock_state();
        state.handle.as_ref().and_then(|h| h.metadata())
    }

    /// Register `callback` for `kind`, replacing any earlier registration.
    /// Registrations outlive handle reloads.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.insert(kind, Arc::new(callback));
        }
    }

    pub fn unsubscribe(&self, kind: EventKind) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.remove(&kind);
        }
    }

    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.listeners
            .lock()
            .map(|l| l.contains_key(&kind))
            .unwrap_or(false)
    }

    /// Stop playback and join the dispatcher thread
    pub fn shutdown(&self) {
        self.stop();
        self.stop_flag.store(true, Ordering::SeqCst);
        let handle = self.dispatcher.lock().ok().and_then(|mut d| d.take());
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The dispatcher loop, running on the dedicated thread
    fn dispatch(
        event_rx: Receiver<EngineEvent>,
        listeners: Listeners,
        current: Arc<AtomicU64>,
        stop_flag: Arc<AtomicBool>,
    ) {
        loop {
            if stop_flag.load(Ordering::SeqCst) {
                return;
            }
            match event_rx.recv_timeout(Duration::from_millis(TICK_MS)) {
                Ok(event) => {
                    if event.handle.0 != current.load(Ordering::SeqCst) {
                        continue;
                    }
                    // Clone out of the lock so callbacks may (un)subscribe
                    let callback = listeners
                        .lock()
                        .ok()
                        .and_then(|l| l.get(&event.event.kind()).cloned());
                    if let Some(callback) = callback {
                        callback(&event);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
