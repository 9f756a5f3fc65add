//! Control loop state
//!
//! Keys map to commands, commands drive the current station. One-shot
//! actions that can block (starting a station, skipping, jumping) run on a
//! worker thread and report back through a channel, so the loop keeps
//! drawing. Failures end up in the status line and the loop carries on.

use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::KeyCode;
use stationdeck::catalog::SearchCategory;
use stationdeck::station::{Station, StationDescriptor, StationKind, TrackObserver};
use stationdeck::store::PlaylistRecord;
use stationdeck::Track;
use stationdeck_app::data::HistoryRecorder;
use stationdeck_app::providers::StationDirectory;
use stationdeck_app::{AppError, StationFactory};
use tracing::{debug, info, warn};

use crate::prompt::{
    Category, InputPurpose, PlaylistUse, Prompt, PromptOutcome, SelectPurpose,
};

const MORE_RESULTS: &str = "More results...";
const NEW_PLAYLIST: &str = "New playlist...";

/// How the session begins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    /// Replay the last-played station
    Resume,
    /// Search a category, prompting for a term when none is given
    Open(Category, Option<String>),
    /// Ask what to play
    Choose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    TogglePause,
    Forward,
    Rewind,
    Search,
    SearchAgain,
    Info,
    Repeat,
    Shuffle,
    Jump,
    AddToPlaylist,
    DeleteTrack,
}

pub fn command_for(code: KeyCode) -> Option<Command> {
    let command = match code {
        KeyCode::Char('q') | KeyCode::Esc => Command::Quit,
        KeyCode::Char('p') | KeyCode::Char(' ') => Command::TogglePause,
        KeyCode::Char('n') | KeyCode::Right => Command::Forward,
        KeyCode::Char('b') | KeyCode::Left => Command::Rewind,
        KeyCode::Char('s') => Command::Search,
        KeyCode::Char('l') => Command::SearchAgain,
        KeyCode::Char('i') => Command::Info,
        KeyCode::Char('r') => Command::Repeat,
        KeyCode::Char('z') => Command::Shuffle,
        KeyCode::Char('j') => Command::Jump,
        KeyCode::Char('a') => Command::AddToPlaylist,
        KeyCode::Char('d') => Command::DeleteTrack,
        _ => return None,
    };
    Some(command)
}

/// Messages from worker threads and track observers.
/// Each carries the generation of the station it concerns.
enum Notice {
    Track { generation: u64, track: Track },
    Status { generation: u64, message: String },
}

type Job = Box<dyn FnOnce(&dyn Station) -> stationdeck::Result<Option<String>> + Send>;

pub struct App {
    factory: StationFactory,
    directory: Box<dyn StationDirectory>,
    search_limit: usize,
    shuffle: bool,
    history: Option<Arc<Mutex<HistoryRecorder>>>,
    station: Option<Arc<dyn Station>>,
    /// Bumped on every station switch; older notices are dropped
    generation: u64,
    notice_tx: Sender<Notice>,
    notice_rx: Receiver<Notice>,
    last_search: Option<(Category, String)>,
    pub now_playing: Option<Track>,
    pub status: String,
    pub prompt: Option<Prompt>,
    pub running: bool,
}

impl App {
    pub fn new(
        factory: StationFactory,
        directory: Box<dyn StationDirectory>,
        search_limit: usize,
        shuffle: bool,
        history: Option<HistoryRecorder>,
    ) -> Self {
        let (notice_tx, notice_rx) = unbounded();
        Self {
            factory,
            directory,
            search_limit,
            shuffle,
            history: history.map(|h| Arc::new(Mutex::new(h))),
            station: None,
            generation: 0,
            notice_tx,
            notice_rx,
            last_search: None,
            now_playing: None,
            status: String::new(),
            prompt: None,
            running: true,
        }
    }

    pub fn station(&self) -> Option<&dyn Station> {
        self.station.as_deref()
    }

    pub fn start(&mut self, startup: Startup) {
        match startup {
            Startup::Resume => match self.factory.store().load_last_played() {
                Ok(Some(descriptor)) => self.switch_to(descriptor),
                Ok(None) => {
                    self.status = "Nothing played yet".to_string();
                    self.open_categories();
                }
                Err(e) => self.report(e.into()),
            },
            Startup::Open(category, term) => self.begin(category, term),
            Startup::Choose => self.open_categories(),
        }
    }

    /// Stop playback and close out history
    pub fn shutdown(&mut self) {
        self.stop_current();
        self.factory.engine().shutdown();
        info!("shut down");
    }

    fn report(&mut self, e: AppError) {
        warn!(error = %e, "action failed");
        self.status = format!("Error: {}", e);
    }

    // =========================================================================
    // Keys
    // =========================================================================

    pub fn handle_key(&mut self, code: KeyCode) {
        if let Some(prompt) = self.prompt.take() {
            match prompt.handle_key(code) {
                PromptOutcome::Open(prompt) => self.prompt = Some(prompt),
                PromptOutcome::Cancelled => {}
                PromptOutcome::Entered(purpose, text) => self.entered(purpose, text),
                PromptOutcome::Chosen {
                    purpose,
                    items,
                    index,
                } => self.chosen(purpose, items, index),
            }
            return;
        }
        if let Some(command) = command_for(code) {
            self.run(command);
        }
    }

    fn run(&mut self, command: Command) {
        debug!(?command, "command");
        match command {
            Command::Quit => self.running = false,
            Command::TogglePause => self.toggle_pause(),
            Command::Forward => self.on_station("skipping", |s| s.forward().map(|_| None)),
            Command::Rewind => self.on_station("rewinding", |s| s.rewind().map(|_| None)),
            Command::Search => self.open_categories(),
            Command::SearchAgain => match self.last_search.clone() {
                Some((category, term)) => self.search(category, term, 0),
                None => self.open_categories(),
            },
            Command::Info => self.on_station("fetching info", |s| {
                Ok(Some(match s.info() {
                    Some(info) => format!("Info: {}", info),
                    None => "Info: ---".to_string(),
                }))
            }),
            Command::Repeat => self.toggle_repeat(),
            Command::Shuffle => self.toggle_shuffle(),
            Command::Jump => self.open_jump(),
            Command::AddToPlaylist => self.open_add_to_playlist(),
            Command::DeleteTrack => self.delete_current(),
        }
    }

    fn entered(&mut self, purpose: InputPurpose, text: String) {
        if text.is_empty() {
            return;
        }
        match purpose {
            InputPurpose::Search(category) => self.search(category, text, 0),
            InputPurpose::NewPlaylist => self.add_current_to(&text),
        }
    }

    fn chosen(&mut self, purpose: SelectPurpose, items: Vec<String>, index: usize) {
        match purpose {
            SelectPurpose::Category => {
                if let Some(&category) = Category::ALL.get(index) {
                    self.begin(category, None);
                }
            }
            SelectPurpose::Hits {
                category,
                term,
                offset,
                hits,
            } => match hits.get(index) {
                Some(hit) => match StationFactory::descriptor_for(hit) {
                    Ok(descriptor) => self.switch_to(descriptor),
                    Err(e) => self.report(e),
                },
                None => self.search(category, term, offset + hits.len()),
            },
            SelectPurpose::Playlist(PlaylistUse::Play) => {
                if let Some(name) = items.into_iter().nth(index) {
                    self.switch_to(StationDescriptor::Playlist {
                        name,
                        shuffle: self.shuffle,
                    });
                }
            }
            SelectPurpose::Playlist(PlaylistUse::Add) => {
                if index + 1 == items.len() {
                    self.prompt = Some(Prompt::input(InputPurpose::NewPlaylist));
                } else if let Some(name) = items.get(index) {
                    self.add_current_to(name);
                }
            }
            SelectPurpose::Jump => {
                self.on_station("jumping", move |s| match s.as_playlist() {
                    Some(controls) => controls.jump_to(index).map(|_| None),
                    None => Ok(None),
                });
            }
        }
    }

    // =========================================================================
    // Searching
    // =========================================================================

    fn open_categories(&mut self) {
        let items = Category::ALL.iter().map(|c| c.label().to_string()).collect();
        self.prompt = Some(Prompt::select(SelectPurpose::Category, items));
    }

    fn begin(&mut self, category: Category, term: Option<String>) {
        let term = term.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        match (category, term) {
            (Category::Relay, _) => self.switch_to(StationFactory::relay()),
            (Category::Playlist, filter) => self.choose_playlist(PlaylistUse::Play, filter),
            (category, Some(term)) => self.search(category, term, 0),
            (category, None) => {
                self.prompt = Some(Prompt::input(InputPurpose::Search(category)));
            }
        }
    }

    fn search(&mut self, category: Category, term: String, offset: usize) {
        let catalog_category = match category {
            Category::Artist => Some(SearchCategory::Artists),
            Category::Song => Some(SearchCategory::Tracks),
            Category::Station => Some(SearchCategory::Stations),
            Category::Radio => None,
            Category::Playlist | Category::Relay => return self.begin(category, Some(term)),
        };
        self.last_search = Some((category, term.clone()));

        let found = match catalog_category {
            Some(c) => self
                .factory
                .catalog()
                .search(&term, c, offset)
                .map_err(AppError::from),
            None => self.directory.search(&term, self.search_limit, offset),
        };
        let hits = match found {
            Ok(hits) => hits,
            Err(e) => return self.report(e),
        };
        info!(term = term.as_str(), ?category, offset, count = hits.len(), "search");

        if hits.is_empty() {
            self.status = if offset == 0 {
                format!("No results for \"{}\"", term)
            } else {
                "No more results".to_string()
            };
            return;
        }

        let mut items: Vec<String> = hits.iter().map(|h| h.to_string()).collect();
        if hits.len() >= self.search_limit {
            items.push(MORE_RESULTS.to_string());
        }
        self.prompt = Some(Prompt::select(
            SelectPurpose::Hits {
                category,
                term,
                offset,
                hits,
            },
            items,
        ));
    }

    fn choose_playlist(&mut self, purpose: PlaylistUse, filter: Option<String>) {
        let names = match self.factory.playlist_names() {
            Ok(names) => names,
            Err(e) => return self.report(e),
        };
        let filter = filter.map(|f| f.to_lowercase());
        let mut names: Vec<String> = names
            .into_iter()
            .filter(|n| filter.as_ref().map_or(true, |f| n.to_lowercase().contains(f)))
            .collect();

        if purpose == PlaylistUse::Play {
            if names.is_empty() {
                self.status = "No playlists found".to_string();
                return;
            }
            if filter.is_some() && names.len() == 1 {
                let name = names.remove(0);
                self.switch_to(StationDescriptor::Playlist {
                    name,
                    shuffle: self.shuffle,
                });
                return;
            }
        } else {
            names.push(NEW_PLAYLIST.to_string());
        }
        self.prompt = Some(Prompt::select(SelectPurpose::Playlist(purpose), names));
    }

    // =========================================================================
    // Station lifecycle
    // =========================================================================

    fn switch_to(&mut self, descriptor: StationDescriptor) {
        let station: Arc<dyn Station> = match self.factory.build(&descriptor) {
            Ok(station) => Arc::from(station),
            Err(e) => return self.report(e),
        };
        self.stop_current();
        self.generation += 1;
        self.now_playing = None;
        info!(station = %descriptor, generation = self.generation, "switching station");

        if let Some(queue) = station.as_queue() {
            queue.on_track_change(self.track_observer(station.name()));
        }
        if let Err(e) = self.factory.store().write_last_played(&descriptor) {
            warn!(error = %e, "could not remember last station");
        }

        self.station = Some(station);
        self.status = format!("Starting {}...", descriptor);
        let label = descriptor.to_string();
        self.on_station("starting", move |s| {
            s.play()?;
            Ok(Some(format!("Playing {}", label)))
        });
    }

    fn stop_current(&mut self) {
        if let Some(station) = self.station.take() {
            station.stop();
        }
        if let Some(ref history) = self.history {
            if let Err(e) = history.lock().unwrap_or_else(|e| e.into_inner()).finish() {
                warn!(error = %e, "could not write history");
            }
        }
    }

    fn track_observer(&self, station: &str) -> TrackObserver {
        let tx = self.notice_tx.clone();
        let history = self.history.clone();
        let station = station.to_string();
        let generation = self.generation;
        Arc::new(move |track: &Track| {
            if let Some(ref history) = history {
                let mut history = history.lock().unwrap_or_else(|e| e.into_inner());
                if let Err(e) = history.now_playing(&station, track) {
                    warn!(error = %e, "could not write history");
                }
            }
            let _ = tx.send(Notice::Track {
                generation,
                track: track.clone(),
            });
        })
    }

    /// Run `job` against the current station on a worker thread
    fn on_station<F>(&mut self, what: &str, job: F)
    where
        F: FnOnce(&dyn Station) -> stationdeck::Result<Option<String>> + Send + 'static,
    {
        let Some(station) = self.station.clone() else {
            self.status = "Nothing is playing".to_string();
            return;
        };
        let job: Job = Box::new(job);
        let tx = self.notice_tx.clone();
        let generation = self.generation;
        let spawned = thread::Builder::new()
            .name("station-action".to_string())
            .spawn(move || {
                let message = match job(station.as_ref()) {
                    Ok(Some(message)) => message,
                    Ok(None) => return,
                    Err(e) => {
                        warn!(error = %e, "station action failed");
                        format!("Error: {}", e)
                    }
                };
                let _ = tx.send(Notice::Status {
                    generation,
                    message,
                });
            });
        if let Err(e) = spawned {
            self.status = format!("Error {}: {}", what, e);
        }
    }

    /// Apply notices from workers and observers
    pub fn poll_notices(&mut self) {
        while let Ok(notice) = self.notice_rx.try_recv() {
            match notice {
                Notice::Track { generation, track } if generation == self.generation => {
                    self.status = format!("Now Playing: {}", track);
                    self.now_playing = Some(track);
                }
                Notice::Status {
                    generation,
                    message,
                } if generation == self.generation => self.status = message,
                _ => debug!("dropped stale notice"),
            }
        }
    }

    // =========================================================================
    // Playback controls
    // =========================================================================

    fn toggle_pause(&mut self) {
        let Some(pause) = self.station.as_ref().map(|s| s.is_playing()) else {
            self.status = "Nothing is playing".to_string();
            return;
        };
        self.status = if pause { "Pausing..." } else { "Resuming..." }.to_string();
        let history = self.history.clone();
        self.on_station("pausing", move |s| {
            let playing = s.toggle_pause(pause)?;
            if let Some(history) = history {
                let mut history = history.lock().unwrap_or_else(|e| e.into_inner());
                if playing {
                    history.resume();
                } else {
                    history.pause();
                }
            }
            Ok(Some(if playing { "Playing" } else { "Paused" }.to_string()))
        });
    }

    fn toggle_repeat(&mut self) {
        let repeat = self
            .station
            .as_ref()
            .and_then(|s| s.as_queue().map(|q| q.toggle_repeat()));
        self.status = match repeat {
            Some(true) => "Repeat on".to_string(),
            Some(false) => "Repeat off".to_string(),
            None => "Repeat needs a track station".to_string(),
        };
    }

    fn toggle_shuffle(&mut self) {
        let Some(station) = self.station.clone() else {
            return;
        };
        let Some(controls) = station.as_playlist() else {
            self.status = "Shuffle needs a playlist".to_string();
            return;
        };
        let shuffled = controls.toggle_shuffle();
        self.status = if shuffled { "Shuffle on" } else { "Shuffle off" }.to_string();
        if let Err(e) = self.factory.store().write_last_played(&station.descriptor()) {
            warn!(error = %e, "could not remember shuffle state");
        }
    }

    fn open_jump(&mut self) {
        let Some(controls) = self.station.as_ref().and_then(|s| s.as_playlist()) else {
            self.status = "Jump needs a playlist".to_string();
            return;
        };
        let items = controls
            .tracks()
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{:>3}. {}", i, t))
            .collect();
        self.prompt = Some(Prompt::select(SelectPurpose::Jump, items));
    }

    fn current_track(&self) -> Option<Track> {
        self.station
            .as_ref()
            .and_then(|s| s.as_queue())
            .and_then(|q| q.current_track())
    }

    fn open_add_to_playlist(&mut self) {
        if self.current_track().is_none() {
            self.status = "No track to add".to_string();
            return;
        }
        self.choose_playlist(PlaylistUse::Add, None);
    }

    fn add_current_to(&mut self, name: &str) {
        let Some(track) = self.current_track() else {
            self.status = "No track to add".to_string();
            return;
        };
        let mut record = match self.factory.playlist(name) {
            Ok(record) => record,
            Err(AppError::NotFound(_)) => PlaylistRecord::new(name),
            Err(e) => return self.report(e),
        };
        if !record.add(track.clone()) {
            self.status = format!("\"{}\" is already in {}", track.title, name);
            return;
        }
        if let Err(e) = self.factory.store().write_playlists(&[record]) {
            return self.report(e.into());
        }

        // The playing playlist picks the track up too
        if let Some(ref station) = self.station {
            if station.kind() == StationKind::Playlist && station.id() == name {
                if let Some(controls) = station.as_playlist() {
                    controls.add_track(track.clone());
                }
            }
        }
        info!(playlist = name, track = track.id.as_str(), "added to playlist");
        self.status = format!("Added \"{}\" to {}", track.title, name);
    }

    /// Skip the current playlist track, then drop it from the playlist
    fn delete_current(&mut self) {
        let is_playlist = self
            .station
            .as_ref()
            .is_some_and(|s| s.as_playlist().is_some());
        if !is_playlist {
            self.status = "Only playlist tracks can be deleted".to_string();
            return;
        }
        let Some(track) = self.current_track() else {
            self.status = "No track to delete".to_string();
            return;
        };
        let store = self.factory.store().clone();
        self.on_station("deleting", move |s| {
            s.forward()?;
            let Some(controls) = s.as_playlist() else {
                return Ok(None);
            };
            controls.remove_track(&track.id);
            store.write_playlists(&[controls.export()])?;
            Ok(Some(format!("Deleted \"{}\"", track.title)))
        });
    }
}
