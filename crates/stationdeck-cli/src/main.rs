//! Stationdeck CLI: terminal audio station player

mod app;
mod prompt;
mod ui;

use std::io::{self, Stdout};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use tracing::info;

use stationdeck::audio::RodioPlayer;
use stationdeck::engine::PlaybackEngine;
use stationdeck::store::Store;
use stationdeck_app::data::{storage, HistoryRecorder, JsonStore, Settings};
use stationdeck_app::providers::{IHeartCatalog, RadioBrowser};
use stationdeck_app::StationFactory;

use crate::app::{App, Startup};
use crate::prompt::Category;

/// Redraw and notice polling interval
const TICK_MS: u64 = 100;

const LOG_FILE: &str = "stationdeck.log";

#[derive(Parser, Debug)]
#[command(name = "stationdeck", about = "Terminal audio station player", version)]
struct Cli {
    /// Search term (playlist name filter with --playlist)
    term: Option<String>,

    /// Artist radio (default when a term is given)
    #[arg(long, group = "category")]
    artist: bool,

    /// Song radio, seeded by the chosen track's artist
    #[arg(long, group = "category")]
    song: bool,

    /// Live catalog station
    #[arg(long, group = "category")]
    station: bool,

    /// Internet radio directory
    #[arg(long, group = "category")]
    radio: bool,

    /// Local playlist
    #[arg(long, group = "category")]
    playlist: bool,

    /// Built-in relay stream
    #[arg(long, group = "category")]
    relay: bool,

    /// Replay the last-played station
    #[arg(long, group = "category")]
    resume: bool,

    /// Start playlists shuffled
    #[arg(long)]
    shuffle: bool,

    /// Write debug logs to a file
    #[arg(short, long)]
    debug: bool,

    /// Log file path (default: stationdeck.log in the data directory)
    #[arg(short, long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn category(&self) -> Option<Category> {
        [
            (self.artist, Category::Artist),
            (self.song, Category::Song),
            (self.station, Category::Station),
            (self.radio, Category::Radio),
            (self.playlist, Category::Playlist),
            (self.relay, Category::Relay),
        ]
        .into_iter()
        .find_map(|(set, category)| set.then_some(category))
    }

    fn startup(&self) -> Startup {
        if self.resume {
            return Startup::Resume;
        }
        match (self.category(), &self.term) {
            (Some(category), term) => Startup::Open(category, term.clone()),
            (None, Some(term)) => Startup::Open(Category::Artist, Some(term.clone())),
            (None, None) => Startup::Choose,
        }
    }
}

fn setup_logging(path: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let file = std::fs::File::create(path).ok()?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_thread_names(true)
        .with_env_filter(filter)
        .init();

    info!("debug logging to {:?}", path);
    Some(guard)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    let (device_id, created) = settings.ensure_device_id();
    if created {
        settings.save()?;
    }
    let data_dir = settings.data_dir()?;
    storage::ensure_dir(&data_dir)?;

    let _log_guard = if cli.debug || cli.log_file.is_some() {
        let path = cli
            .log_file
            .clone()
            .unwrap_or_else(|| data_dir.join(LOG_FILE));
        setup_logging(&path)
    } else {
        None
    };

    // Network and device setup print to stderr on failure
    eprintln!("Connecting...");
    let catalog = Arc::new(IHeartCatalog::login(
        &device_id,
        settings.market_id,
        settings.search_limit,
    )?);
    let user_id = catalog.user_id().to_string();
    let engine = Arc::new(PlaybackEngine::new(Box::new(RodioPlayer::new()?))?);
    let store: Arc<dyn Store> = Arc::new(JsonStore::new(&data_dir));
    let factory = StationFactory::new(engine, catalog, user_id, store);
    let history = settings
        .track_history
        .then(|| HistoryRecorder::new(&data_dir, settings.history_min_secs));
    let mut app = App::new(
        factory,
        Box::new(RadioBrowser::new()?),
        settings.search_limit,
        cli.shuffle,
        history,
    );

    // Suppress stderr during TUI. ALSA/PulseAudio and other libs write
    // diagnostic messages to stderr which corrupt the display.
    let saved_stderr = unsafe { libc::dup(2) };
    {
        let devnull = std::fs::File::open("/dev/null")?;
        unsafe { libc::dup2(devnull.as_raw_fd(), 2) };
    }

    terminal::enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    app.start(cli.startup());
    let result = run(&mut terminal, &mut app);

    // Stop the engine while still in the alternate screen
    app.shutdown();
    drop(app);

    terminal::disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    if saved_stderr >= 0 {
        unsafe {
            libc::dup2(saved_stderr, 2);
            libc::close(saved_stderr);
        }
    }

    Ok(result?)
}

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> io::Result<()> {
    let tick = Duration::from_millis(TICK_MS);
    while app.running {
        app.poll_notices();
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                // Raw mode swallows SIGINT
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    app.running = false;
                } else {
                    app.handle_key(key.code);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stationdeck").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn bare_term_searches_artists() {
        assert_eq!(
            parse(&["radiohead"]).startup(),
            Startup::Open(Category::Artist, Some("radiohead".to_string()))
        );
    }

    #[test]
    fn no_arguments_asks() {
        assert_eq!(parse(&[]).startup(), Startup::Choose);
    }

    #[test]
    fn category_flags() {
        assert_eq!(
            parse(&["--station", "kiss"]).startup(),
            Startup::Open(Category::Station, Some("kiss".to_string()))
        );
        assert_eq!(
            parse(&["--playlist", "--shuffle"]).startup(),
            Startup::Open(Category::Playlist, None)
        );
        assert_eq!(parse(&["--relay"]).startup(), Startup::Open(Category::Relay, None));
        assert_eq!(parse(&["--resume"]).startup(), Startup::Resume);
    }

    #[test]
    fn shuffle_and_logging_flags() {
        let cli = parse(&["--playlist", "--shuffle", "--debug", "--log-file", "/tmp/x.log"]);
        assert!(cli.shuffle);
        assert!(cli.debug);
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/x.log")));
    }

    #[test]
    fn categories_conflict() {
        let result = Cli::try_parse_from(["stationdeck", "--artist", "--song", "x"]);
        assert!(result.is_err());
    }
}
