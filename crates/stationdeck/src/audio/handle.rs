//! One rodio-backed output handle
//!
//! Resolution, buffering and probing run on the handle's own thread so that
//! `open` returns at once. The same thread then monitors playback and turns
//! position and end-of-media into engine events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use rodio::mixer::Mixer;
use rodio::Decoder;
use tracing::{debug, info, warn};

use crate::config::engine::TICK_MS;
use crate::engine::{EngineEvent, EventSender, HandleId, OutputHandle, PlayerEvent};
use crate::error::{DeckError, Result};
use crate::stream::{StreamBuffer, StreamMetadata, StreamResolver};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Opening,
    Ready,
    Failed(String),
    Ended,
}

struct Shared {
    player: rodio::Player,
    phase: Mutex<Phase>,
    play_requested: AtomicBool,
    stop_flag: Arc<AtomicBool>,
    metadata: Mutex<Option<StreamMetadata>>,
    seekable: AtomicBool,
}

impl Shared {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }
}

/// Output handle playing one locator through the shared mixer
pub struct RodioHandle {
    id: HandleId,
    shared: Arc<Shared>,
}

impl RodioHandle {
    pub fn open(mixer: &Mixer, locator: &str, id: HandleId, events: EventSender) -> Result<Self> {
        let player = rodio::Player::connect_new(mixer);
        player.pause();

        let shared = Arc::new(Shared {
            player,
            phase: Mutex::new(Phase::Opening),
            play_requested: AtomicBool::new(false),
            stop_flag: Arc::new(AtomicBool::new(false)),
            metadata: Mutex::new(None),
            seekable: AtomicBool::new(false),
        });

        let worker_shared = shared.clone();
        let locator = locator.to_string();
        thread::Builder::new()
            .name(format!("audio-handle-{}", id.0))
            .spawn(move || run_handle(worker_shared, locator, id, events))
            .map_err(|e| DeckError::Audio(format!("Failed to spawn handle thread: {}", e)))?;

        Ok(Self { id, shared })
    }
}

impl OutputHandle for RodioHandle {
    fn play(&mut self) -> Result<()> {
        if let Phase::Failed(reason) = &*self.shared.phase() {
            return Err(DeckError::StreamUnavailable(reason.clone()));
        }
        self.shared.play_requested.store(true, Ordering::SeqCst);
        if *self.shared.phase() == Phase::Ready {
            self.shared.player.play();
        }
        Ok(())
    }

    fn stop(&mut self) {
        if !self.shared.stop_flag.swap(true, Ordering::SeqCst) {
            debug!(handle = %self.id, "stopping output handle");
        }
        self.shared.player.stop();
    }

    fn is_playing(&self) -> bool {
        *self.shared.phase() == Phase::Ready
            && self.shared.play_requested.load(Ordering::SeqCst)
            && !self.shared.player.is_paused()
            && !self.shared.player.empty()
    }

    fn set_paused(&mut self, paused: bool) {
        if paused {
            self.shared.player.pause();
        } else if self.shared.play_requested.load(Ordering::SeqCst) {
            self.shared.player.play();
        }
    }

    fn seek(&mut self, delta_ms: i64) {
        if !self.shared.seekable.load(Ordering::SeqCst) || self.shared.player.is_paused() {
            debug!(handle = %self.id, "seek ignored");
            return;
        }
        let current = self.shared.player.get_pos().as_millis() as i64;
        let target = Duration::from_millis(current.saturating_add(delta_ms).max(0) as u64);
        if let Err(e) = self.shared.player.try_seek(target) {
            warn!(handle = %self.id, error = %e, "seek failed");
        }
    }

    fn metadata(&self) -> Option<StreamMetadata> {
        self.shared
            .metadata
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn failure(&self) -> Option<String> {
        match &*self.shared.phase() {
            Phase::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }
}

impl Drop for RodioHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_handle(shared: Arc<Shared>, locator: String, id: HandleId, events: EventSender) {
    let metadata_rx = match prepare(&shared, &locator) {
        Ok(rx) => rx,
        Err(_) if shared.stopped() => return,
        Err(e) => {
            warn!(handle = %id, locator = locator.as_str(), error = %e, "could not open stream");
            *shared.phase() = Phase::Failed(e.to_string());
            return;
        }
    };

    *shared.phase() = Phase::Ready;
    if shared.play_requested.load(Ordering::SeqCst) && !shared.stopped() {
        shared.player.play();
    }
    info!(handle = %id, locator = locator.as_str(), "stream ready");

    let tick = Duration::from_millis(TICK_MS);
    loop {
        if shared.stopped() {
            return;
        }

        if let Some(rx) = &metadata_rx {
            if let Some(latest) = rx.try_iter().last() {
                debug!(handle = %id, title = ?latest.title, "stream metadata");
                *shared.metadata.lock().unwrap_or_else(|e| e.into_inner()) = Some(latest);
            }
        }

        if shared.player.empty() {
            *shared.phase() = Phase::Ended;
            debug!(handle = %id, "stream ended");
            let _ = events.send(EngineEvent {
                handle: id,
                event: PlayerEvent::StreamEnded,
            });
            return;
        }

        if shared.play_requested.load(Ordering::SeqCst) && !shared.player.is_paused() {
            let _ = events.send(EngineEvent {
                handle: id,
                event: PlayerEvent::PositionChanged {
                    elapsed: shared.player.get_pos(),
                },
            });
        }

        thread::sleep(tick);
    }
}

/// Resolve, buffer and probe `locator`, then queue it on the player
fn prepare(shared: &Shared, locator: &str) -> Result<Option<Receiver<StreamMetadata>>> {
    let stream = StreamResolver::resolve(locator)?;
    if shared.stopped() {
        return Err(DeckError::Cancelled);
    }

    let live = stream.info.live;
    let (reader, _producer_stop) = StreamBuffer::new(stream.reader, live)?;

    let mut builder = Decoder::builder().with_data(reader).with_seekable(!live);
    if let Some(len) = stream.info.content_length {
        builder = builder.with_byte_len(len);
    }
    if let Some(hint) = stream.info.format_hint.as_deref() {
        builder = builder.with_hint(hint);
    }
    let decoder = builder
        .build()
        .map_err(|e| DeckError::Decode(format!("Unable to decode {}: {}", locator, e)))?;

    if shared.stopped() {
        return Err(DeckError::Cancelled);
    }
    shared.seekable.store(!live, Ordering::SeqCst);
    shared.player.append(decoder);
    Ok(stream.metadata_rx)
}
