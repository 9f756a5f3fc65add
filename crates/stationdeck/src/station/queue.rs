//! Queue stations
//!
//! Plays discrete tracks pulled from a [`TrackSource`] and advances on
//! `StreamEnded`. Every advance, natural or forced, runs under one lock and
//! is keyed to the handle it replaces, so a skip and a concurrent natural
//! end of the same track advance exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::config::queue::MAX_START_FAILURES;
use crate::engine::{EngineEvent, EventKind, HandleId, PlaybackEngine, PlayerEvent};
use crate::error::{DeckError, Result};
use crate::source::TrackSource;
use crate::store::PlaylistRecord;
use crate::track::Track;

use super::{
    PlaylistControls, Progress, QueueControls, Station, StationDescriptor, StationInfo,
    StationKind,
};

/// Called with each track that starts playing
pub type TrackObserver = Arc<dyn Fn(&Track) + Send + Sync>;

/// What triggered an advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    /// The track ended on its own. Start failures move on to later tracks
    /// and back off once several fail in a row. Never gives up.
    Natural,
    /// The user skipped. Errors propagate.
    Skip,
    /// The source was repositioned. Always pulls, ignoring repeat.
    Jump,
}

#[derive(Default)]
struct QueueState {
    current: Option<Track>,
    handle: Option<HandleId>,
    repeat: bool,
    elapsed: Duration,
}

struct QueueInner<S> {
    engine: Arc<PlaybackEngine>,
    descriptor: StationDescriptor,
    source: Mutex<S>,
    state: Mutex<QueueState>,
    /// Serializes advances
    advancing: Mutex<()>,
    stop_flag: Arc<AtomicBool>,
    observers: Mutex<Vec<TrackObserver>>,
    is_playlist: bool,
    backoff: Backoff,
}

/// A station over a sequence of discrete tracks
pub struct QueueStation<S: TrackSource> {
    inner: Arc<QueueInner<S>>,
}

impl<S: TrackSource> QueueStation<S> {
    pub fn new(engine: Arc<PlaybackEngine>, descriptor: StationDescriptor, mut source: S) -> Self {
        let is_playlist = source.as_sequencer().is_some();
        Self {
            inner: Arc::new(QueueInner {
                engine,
                descriptor,
                source: Mutex::new(source),
                state: Mutex::new(QueueState::default()),
                advancing: Mutex::new(()),
                stop_flag: Arc::new(AtomicBool::new(false)),
                observers: Mutex::new(Vec::new()),
                is_playlist,
                backoff: Backoff::default(),
            }),
        }
    }

    /// Override the delay policy used when tracks keep failing to start
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.backoff = backoff;
        }
        self
    }

    /// Handle of the track this station last loaded
    pub fn current_handle(&self) -> Option<HandleId> {
        self.inner.state().handle
    }
}

impl<S: TrackSource> QueueInner<S> {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn source(&self) -> MutexGuard<'_, S> {
        self.source.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_advance(&self) -> MutexGuard<'_, ()> {
        self.advancing.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Whether the engine's handle is the one this station loaded
    fn owns_engine(&self) -> bool {
        let ours = self.state().handle;
        ours.is_some() && self.engine.current_handle() == ours
    }

    fn subscribe(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.engine.subscribe(EventKind::StreamEnded, move |event: &EngineEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.on_stream_ended(event.handle);
            }
        });
        let weak: Weak<Self> = Arc::downgrade(self);
        self.engine
            .subscribe(EventKind::PositionChanged, move |event: &EngineEvent| {
                if let (Some(inner), PlayerEvent::PositionChanged { elapsed }) =
                    (weak.upgrade(), &event.event)
                {
                    let mut state = inner.state();
                    if state.handle == Some(event.handle) {
                        state.elapsed = *elapsed;
                    }
                }
            });
    }

    /// Runs on the engine's event thread
    fn on_stream_ended(&self, ended: HandleId) {
        let _guard = self.lock_advance();
        if self.is_stopped() || self.state().handle != Some(ended) {
            return;
        }
        debug!(station = self.descriptor.name(), handle = %ended, "track ended");
        match self.advance(Advance::Natural) {
            Ok(()) | Err(DeckError::Cancelled) => {}
            // Only the source can fail here, e.g. a playlist emptied under us
            Err(e) => {
                error!(station = self.descriptor.name(), "automatic advance stopped: {}", e);
                self.engine.stop();
            }
        }
    }

    /// Pick the next track and play it. Caller holds the advance lock.
    fn advance(&self, mode: Advance) -> Result<()> {
        let mut failures = 0u32;
        loop {
            if self.is_stopped() {
                return Err(DeckError::Cancelled);
            }
            let replay = {
                let state = self.state();
                match state.current {
                    Some(ref track) if state.repeat && mode != Advance::Jump && failures == 0 => {
                        Some(track.clone())
                    }
                    _ => None,
                }
            };
            let track = match replay {
                Some(track) => track,
                None => self.source().next_track(&self.stop_flag)?,
            };
            match self.play_track(track) {
                Ok(()) => return Ok(()),
                Err(DeckError::Cancelled) => return Err(DeckError::Cancelled),
                Err(e) if mode != Advance::Natural => return Err(e),
                Err(e) => {
                    failures += 1;
                    warn!(
                        station = self.descriptor.name(),
                        attempt = failures,
                        "track failed to start: {}",
                        e
                    );
                    if failures >= MAX_START_FAILURES {
                        let retry = failures + 1 - MAX_START_FAILURES;
                        if !self.backoff.sleep(retry, &self.stop_flag) {
                            return Err(DeckError::Cancelled);
                        }
                    }
                }
            }
        }
    }

    /// Load `track` on a fresh handle and start it
    fn play_track(&self, track: Track) -> Result<()> {
        // A fresh handle even when repeating the same locator
        self.engine.stop();
        let handle = self.engine.load(&track.locator)?;
        {
            let mut state = self.state();
            state.handle = Some(handle);
            state.current = Some(track.clone());
            state.elapsed = Duration::ZERO;
        }
        if self.is_stopped() {
            self.engine.stop();
            return Err(DeckError::Cancelled);
        }
        self.engine.start()?;
        info!(station = self.descriptor.name(), handle = %handle, track = %track, "now playing");
        self.notify(&track);
        Ok(())
    }

    fn notify(&self, track: &Track) {
        let observers: Vec<TrackObserver> = self
            .observers
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default();
        for observer in observers {
            observer(track);
        }
    }
}

impl<S: TrackSource> Station for QueueStation<S> {
    fn id(&self) -> &str {
        self.inner.descriptor.id()
    }

    fn name(&self) -> &str {
        self.inner.descriptor.name()
    }

    fn kind(&self) -> StationKind {
        self.inner.descriptor.kind()
    }

    fn locator(&self) -> Option<String> {
        self.inner.state().current.as_ref().map(|t| t.locator.clone())
    }

    fn play(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.owns_engine() && inner.engine.is_playing() {
            return Ok(());
        }
        inner.stop_flag.store(false, Ordering::SeqCst);
        inner.subscribe();
        let _guard = inner.lock_advance();
        inner.advance(Advance::Skip)
    }

    fn stop(&self) {
        let inner = &self.inner;
        inner.stop_flag.store(true, Ordering::SeqCst);
        inner.engine.unsubscribe(EventKind::StreamEnded);
        inner.engine.unsubscribe(EventKind::PositionChanged);
        inner.engine.stop();
        debug!(station = self.name(), "stopped");
    }

    fn toggle_pause(&self, pause: bool) -> Result<bool> {
        if !self.inner.owns_engine() {
            return Ok(false);
        }
        Ok(self.inner.engine.pause(pause))
    }

    fn is_playing(&self) -> bool {
        self.inner.owns_engine() && self.inner.engine.is_playing()
    }

    fn is_paused(&self) -> bool {
        self.inner.owns_engine() && self.inner.engine.is_paused()
    }

    /// Skip the current track. No-op before the first track has started.
    fn forward(&self) -> Result<()> {
        let inner = &self.inner;
        let skipping = inner.state().handle;
        if skipping.is_none() {
            return Ok(());
        }
        let _guard = inner.lock_advance();
        // A natural end got there first; the skip already happened
        if inner.state().handle != skipping {
            return Ok(());
        }
        debug!(station = self.name(), "skip");
        inner.advance(Advance::Skip)
    }

    fn rewind(&self) -> Result<()> {
        Ok(())
    }

    fn info(&self) -> Option<StationInfo> {
        self.current_track().map(StationInfo::Track)
    }

    fn descriptor(&self) -> StationDescriptor {
        match self.inner.descriptor {
            StationDescriptor::Playlist { ref name, .. } => StationDescriptor::Playlist {
                name: name.clone(),
                shuffle: self.is_shuffled(),
            },
            ref other => other.clone(),
        }
    }

    fn progress(&self) -> Option<Progress> {
        let state = self.inner.state();
        state.current.as_ref().map(|track| Progress {
            elapsed: state.elapsed,
            total: track.duration(),
        })
    }

    fn as_queue(&self) -> Option<&dyn QueueControls> {
        Some(self)
    }

    fn as_playlist(&self) -> Option<&dyn PlaylistControls> {
        if self.inner.is_playlist {
            Some(self)
        } else {
            None
        }
    }
}

impl<S: TrackSource> QueueControls for QueueStation<S> {
    fn toggle_repeat(&self) -> bool {
        let mut state = self.inner.state();
        state.repeat = !state.repeat;
        debug!(station = self.inner.descriptor.name(), repeat = state.repeat, "repeat toggled");
        state.repeat
    }

    fn is_repeat(&self) -> bool {
        self.inner.state().repeat
    }

    fn current_track(&self) -> Option<Track> {
        self.inner.state().current.clone()
    }

    fn on_track_change(&self, observer: TrackObserver) {
        if let Ok(mut observers) = self.inner.observers.lock() {
            observers.push(observer);
        }
    }
}

impl<S: TrackSource> PlaylistControls for QueueStation<S> {
    fn jump_to(&self, index: usize) -> Result<()> {
        let inner = &self.inner;
        {
            let mut source = inner.source();
            let seq = source
                .as_sequencer()
                .ok_or_else(|| DeckError::InvalidChoice("not a playlist".to_string()))?;
            seq.jump_to(index)?;
        }
        inner.stop_flag.store(false, Ordering::SeqCst);
        inner.subscribe();
        let _guard = inner.lock_advance();
        inner.advance(Advance::Jump)
    }

    fn toggle_shuffle(&self) -> bool {
        self.inner
            .source()
            .as_sequencer()
            .map(|seq| seq.toggle_shuffle())
            .unwrap_or(false)
    }

    fn is_shuffled(&self) -> bool {
        self.inner
            .source()
            .as_sequencer_ref()
            .is_some_and(|seq| seq.is_shuffled())
    }

    fn remove_track(&self, track_id: &str) -> bool {
        self.inner
            .source()
            .as_sequencer()
            .is_some_and(|seq| seq.remove_by_id(track_id))
    }

    fn add_track(&self, track: Track) -> bool {
        self.inner
            .source()
            .as_sequencer()
            .is_some_and(|seq| seq.add_track(track))
    }

    fn tracks(&self) -> Vec<Track> {
        self.inner
            .source()
            .as_sequencer_ref()
            .map(|seq| seq.tracks().to_vec())
            .unwrap_or_default()
    }

    fn upcoming(&self) -> Vec<Track> {
        self.inner
            .source()
            .as_sequencer_ref()
            .map(|seq| seq.upcoming().cloned().collect())
            .unwrap_or_default()
    }

    fn export(&self) -> PlaylistRecord {
        self.inner
            .source()
            .as_sequencer_ref()
            .map(|seq| seq.export())
            .unwrap_or_else(|| PlaylistRecord::new(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{PlaylistSequencer, RemoteQueueSource};
    use crate::testing::{fast_backoff, fast_options, track, MockCatalog, MockPlayer};
    use std::thread;
    use std::time::Instant;

    fn engine(player: &MockPlayer) -> Arc<PlaybackEngine> {
        Arc::new(PlaybackEngine::with_options(Box::new(player.clone()), fast_options()).unwrap())
    }

    fn playlist_station(
        engine: Arc<PlaybackEngine>,
        ids: &[&str],
    ) -> QueueStation<PlaylistSequencer> {
        let seq = PlaylistSequencer::new("mix", ids.iter().map(|id| track(id)).collect());
        QueueStation::new(
            engine,
            StationDescriptor::Playlist {
                name: "mix".to_string(),
                shuffle: false,
            },
            seq,
        )
    }

    fn current_id<S: TrackSource>(station: &QueueStation<S>) -> Option<String> {
        station.current_track().map(|t| t.id)
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(2) {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn play_starts_first_track() {
        let player = MockPlayer::new();
        let engine = engine(&player);
        let station = playlist_station(engine.clone(), &["A", "B"]);
        station.play().unwrap();
        assert_eq!(current_id(&station).as_deref(), Some("A"));
        assert!(station.is_playing());
        assert_eq!(station.locator().as_deref(), Some("http://tracks/A.mp3"));
        assert!(engine.is_subscribed(EventKind::StreamEnded));
    }

    #[test]
    fn natural_end_advances() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B", "C"]);
        station.play().unwrap();
        let handle = station.current_handle().unwrap();
        player.emit(handle, PlayerEvent::StreamEnded);
        assert!(wait_for(|| current_id(&station).as_deref() == Some("B")));
        assert!(station.is_playing());
    }

    #[test]
    fn forward_with_racing_natural_end_advances_once() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B", "C", "D"]);
        station.play().unwrap();
        let skipped = station.current_handle().unwrap();

        station.forward().unwrap();
        // The skipped track's natural end, both through the engine and
        // delivered straight to the station as if it had raced the skip
        player.emit(skipped, PlayerEvent::StreamEnded);
        station.inner.on_stream_ended(skipped);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(current_id(&station).as_deref(), Some("B"));
        assert_eq!(player.opened().len(), 2);
    }

    #[test]
    fn forward_before_play_is_noop() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B"]);
        station.forward().unwrap();
        assert!(current_id(&station).is_none());
        assert!(player.opened().is_empty());
    }

    #[test]
    fn repeat_replays_current_track() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B"]);
        station.play().unwrap();
        assert!(station.toggle_repeat());

        station.forward().unwrap();
        assert_eq!(current_id(&station).as_deref(), Some("A"));

        let handle = station.current_handle().unwrap();
        player.emit(handle, PlayerEvent::StreamEnded);
        assert!(wait_for(|| station.current_handle() != Some(handle)));
        assert_eq!(current_id(&station).as_deref(), Some("A"));
        assert_eq!(player.max_live_handles(), 1);

        assert!(!station.toggle_repeat());
        station.forward().unwrap();
        assert_eq!(current_id(&station).as_deref(), Some("B"));
    }

    #[test]
    fn jump_takes_effect_immediately() {
        let player = MockPlayer::new();
        let engine = engine(&player);
        let station = playlist_station(engine.clone(), &["A", "B", "C", "D"]);
        station.play().unwrap();
        assert_eq!(current_id(&station).as_deref(), Some("A"));

        station.jump_to(2).unwrap();
        assert_eq!(engine.current_locator().as_deref(), Some("http://tracks/C.mp3"));
        assert_eq!(current_id(&station).as_deref(), Some("C"));
        station.forward().unwrap();
        assert_eq!(current_id(&station).as_deref(), Some("D"));
    }

    #[test]
    fn jump_ignores_repeat() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B", "C"]);
        station.play().unwrap();
        station.toggle_repeat();
        station.jump_to(1).unwrap();
        assert_eq!(current_id(&station).as_deref(), Some("B"));
    }

    #[test]
    fn jump_out_of_range_keeps_playing() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B"]);
        station.play().unwrap();
        assert!(matches!(
            station.jump_to(5),
            Err(DeckError::InvalidIndex { index: 5, len: 2 })
        ));
        assert_eq!(current_id(&station).as_deref(), Some("A"));
        assert!(station.is_playing());
    }

    #[test]
    fn stop_unsubscribes_and_releases() {
        let player = MockPlayer::new();
        let engine = engine(&player);
        let station = playlist_station(engine.clone(), &["A", "B"]);
        station.play().unwrap();
        let handle = station.current_handle().unwrap();
        station.stop();

        assert!(!engine.is_subscribed(EventKind::StreamEnded));
        assert_eq!(player.live_handles(), 0);
        player.emit(handle, PlayerEvent::StreamEnded);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(player.opened().len(), 1);
        assert!(!station.is_playing());
    }

    #[test]
    fn pause_and_resume() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A"]);
        station.play().unwrap();
        assert!(!station.toggle_pause(true).unwrap());
        assert!(station.is_paused());
        assert!(station.toggle_pause(false).unwrap());
        assert!(!station.is_paused());
        assert_eq!(player.opened().len(), 1);
    }

    #[test]
    fn position_events_drive_progress() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A"]);
        station.play().unwrap();
        let handle = station.current_handle().unwrap();
        player.emit(
            handle,
            PlayerEvent::PositionChanged {
                elapsed: Duration::from_secs(30),
            },
        );
        assert!(wait_for(|| station
            .progress()
            .is_some_and(|p| p.elapsed == Duration::from_secs(30))));
        let progress = station.progress().unwrap();
        assert_eq!(progress.remaining(), Duration::from_secs(150));
    }

    #[test]
    fn observers_see_each_new_track() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B"]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        station.on_track_change(Arc::new(move |t: &Track| {
            sink.lock().unwrap().push(t.id.clone());
        }));
        station.play().unwrap();
        station.forward().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn automatic_advance_recovers_after_start_failures() {
        let player = MockPlayer::new();
        let station =
            playlist_station(engine(&player), &["A", "B", "C"]).with_backoff(fast_backoff());
        station.play().unwrap();
        let handle = station.current_handle().unwrap();

        player.set_open_error(true);
        player.emit(handle, PlayerEvent::StreamEnded);
        // Keeps cycling through the playlist well past one full lap
        assert!(wait_for(|| player.opened().len() >= 8));
        assert!(!station.is_playing());

        player.set_open_error(false);
        assert!(wait_for(|| station.is_playing()));
        assert!(current_id(&station).is_some());
    }

    #[test]
    fn stop_ends_start_failure_retries() {
        let player = MockPlayer::new();
        let station =
            playlist_station(engine(&player), &["A", "B"]).with_backoff(fast_backoff());
        station.play().unwrap();
        let handle = station.current_handle().unwrap();

        player.set_open_error(true);
        player.emit(handle, PlayerEvent::StreamEnded);
        assert!(wait_for(|| player.opened().len() >= 4));
        station.stop();
        thread::sleep(Duration::from_millis(50));
        let attempts = player.opened().len();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(player.opened().len(), attempts);
    }

    #[test]
    fn skip_propagates_start_errors() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B"]);
        station.play().unwrap();
        player.set_never_plays(true);
        let err = station.forward().unwrap_err();
        assert!(matches!(err, DeckError::StartupTimeout { .. }));
    }

    #[test]
    fn remove_and_add_through_controls() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B", "C"]);
        let controls = station.as_playlist().unwrap();
        assert!(controls.remove_track("B"));
        assert!(controls.add_track(track("D")));
        assert!(!controls.add_track(track("A")));
        let ids: Vec<String> = controls.tracks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["A", "C", "D"]);
        assert_eq!(controls.export().tracks.len(), 3);
    }

    #[test]
    fn track_added_while_playing_follows_stored_order() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B", "C"]);
        station.play().unwrap();
        assert!(station.add_track(track("D")));

        let upcoming: Vec<String> = station.upcoming().into_iter().map(|t| t.id).collect();
        assert_eq!(upcoming, vec!["B", "C", "D", "A"]);
        for expected in ["B", "C", "D", "A"] {
            station.forward().unwrap();
            assert_eq!(current_id(&station).as_deref(), Some(expected));
        }
    }

    #[test]
    fn descriptor_tracks_shuffle_state() {
        let player = MockPlayer::new();
        let station = playlist_station(engine(&player), &["A", "B"]);
        assert!(station.toggle_shuffle());
        assert_eq!(
            station.descriptor(),
            StationDescriptor::Playlist {
                name: "mix".to_string(),
                shuffle: true
            }
        );
    }

    #[test]
    fn remote_station_has_no_playlist_controls() {
        let player = MockPlayer::new();
        let catalog = Arc::new(MockCatalog::new(3));
        let source = RemoteQueueSource::new(catalog, "user", "artist-1").with_backoff(fast_backoff());
        let station = QueueStation::new(
            engine(&player),
            StationDescriptor::Artist {
                id: "artist-1".to_string(),
                name: "Queen".to_string(),
            },
            source,
        );
        assert!(station.as_playlist().is_none());
        assert!(station.as_queue().is_some());
        station.play().unwrap();
        assert_eq!(current_id(&station).as_deref(), Some("r0"));
    }

    #[test]
    fn remote_station_survives_transient_failures() {
        let player = MockPlayer::new();
        let catalog = Arc::new(MockCatalog::new(2).fail_times(3));
        let source = RemoteQueueSource::new(catalog, "user", "artist-1").with_backoff(fast_backoff());
        let station = QueueStation::new(
            engine(&player),
            StationDescriptor::Artist {
                id: "artist-1".to_string(),
                name: "Queen".to_string(),
            },
            source,
        );
        station.play().unwrap();
        assert_eq!(current_id(&station).as_deref(), Some("r0"));
    }

    #[test]
    fn stop_cancels_blocked_remote_pull() {
        let player = MockPlayer::new();
        let catalog = Arc::new(MockCatalog::new(1).fail_times(u32::MAX));
        let source = RemoteQueueSource::new(catalog, "user", "artist-1");
        let station = Arc::new(QueueStation::new(
            engine(&player),
            StationDescriptor::Artist {
                id: "artist-1".to_string(),
                name: "Queen".to_string(),
            },
            source,
        ));
        let runner = station.clone();
        let t = thread::spawn(move || runner.play());
        thread::sleep(Duration::from_millis(100));
        station.stop();
        let result = t.join().unwrap();
        assert!(matches!(result, Err(DeckError::Cancelled)));
    }
}
