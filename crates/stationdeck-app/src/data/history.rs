//! Per-session track history
//!
//! One file per run, `history/SESSION-<start time>.json`, rewritten each
//! time a track is recorded. A track is recorded once the next one starts
//! (or the session ends) and only if it played long enough. Time spent
//! paused does not count.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use stationdeck::Track;
use tracing::debug;

use crate::config::storage::HISTORY_DIR;
use crate::data::storage;
use crate::error::Result;

/// A track that played long enough to count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub station: String,
    pub track: Track,
    pub play_start: DateTime<Local>,
    pub play_end: DateTime<Local>,
    pub played_secs: u64,
}

struct Playing {
    station: String,
    track: Track,
    since: DateTime<Local>,
    paused_for: Duration,
    paused_since: Option<DateTime<Local>>,
}

impl Playing {
    fn played_secs(&self, at: DateTime<Local>) -> u64 {
        let open_pause = self.paused_since.map_or(Duration::zero(), |p| at - p);
        (at - self.since - self.paused_for - open_pause)
            .num_seconds()
            .max(0) as u64
    }
}

pub struct HistoryRecorder {
    path: PathBuf,
    min_secs: u64,
    entries: Vec<HistoryEntry>,
    playing: Option<Playing>,
}

impl HistoryRecorder {
    /// Start a session under `data_dir`
    pub fn new(data_dir: &Path, min_secs: u64) -> Self {
        Self::started_at(data_dir, min_secs, Local::now())
    }

    pub fn started_at(data_dir: &Path, min_secs: u64, started: DateTime<Local>) -> Self {
        let file = format!("SESSION-{}.json", started.format("%Y-%m-%d--%H-%M-%S"));
        Self {
            path: data_dir.join(HISTORY_DIR).join(file),
            min_secs,
            entries: Vec::new(),
            playing: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Note that `track` started; returns whether the previous track was recorded
    pub fn now_playing(&mut self, station: &str, track: &Track) -> Result<bool> {
        self.now_playing_at(station, track, Local::now())
    }

    pub fn now_playing_at(
        &mut self,
        station: &str,
        track: &Track,
        at: DateTime<Local>,
    ) -> Result<bool> {
        let recorded = self.finish_at(at)?;
        self.playing = Some(Playing {
            station: station.to_string(),
            track: track.clone(),
            since: at,
            paused_for: Duration::zero(),
            paused_since: None,
        });
        Ok(recorded)
    }

    /// Stop counting play time until [`resume`](Self::resume)
    pub fn pause(&mut self) {
        self.pause_at(Local::now());
    }

    pub fn pause_at(&mut self, at: DateTime<Local>) {
        if let Some(ref mut playing) = self.playing {
            playing.paused_since.get_or_insert(at);
        }
    }

    pub fn resume(&mut self) {
        self.resume_at(Local::now());
    }

    pub fn resume_at(&mut self, at: DateTime<Local>) {
        if let Some(ref mut playing) = self.playing {
            if let Some(since) = playing.paused_since.take() {
                playing.paused_for = playing.paused_for + (at - since);
            }
        }
    }

    /// Close out the current track (station switch or exit)
    pub fn finish(&mut self) -> Result<bool> {
        self.finish_at(Local::now())
    }

    pub fn finish_at(&mut self, at: DateTime<Local>) -> Result<bool> {
        let Some(prev) = self.playing.take() else {
            return Ok(false);
        };

        let played = prev.played_secs(at);
        if played < self.min_secs {
            debug!(track = prev.track.id.as_str(), played, "too short for history");
            return Ok(false);
        }

        self.entries.push(HistoryEntry {
            station: prev.station,
            track: prev.track,
            play_start: prev.since,
            play_end: at,
            played_secs: played,
        });
        storage::write_json(&self.path, &self.entries)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::storage::test_support::temp_path;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 18, 5, 7).unwrap()
    }

    fn track(id: &str) -> Track {
        Track::new(id, format!("Song {}", id), format!("http://t/{}", id))
    }

    #[test]
    fn session_file_named_after_start() {
        let recorder = HistoryRecorder::started_at(Path::new("/d"), 10, start());
        assert_eq!(
            recorder.path(),
            Path::new("/d/history/SESSION-2024-03-09--18-05-07.json")
        );
    }

    #[test]
    fn records_previous_track_when_long_enough() {
        let root = temp_path("history_long");
        let mut rec = HistoryRecorder::started_at(&root, 10, start());

        assert!(!rec.now_playing_at("Band Radio", &track("1"), start()).unwrap());
        let later = start() + Duration::seconds(95);
        assert!(rec.now_playing_at("Band Radio", &track("2"), later).unwrap());

        assert_eq!(rec.entries().len(), 1);
        assert_eq!(rec.entries()[0].track.id, "1");
        assert_eq!(rec.entries()[0].played_secs, 95);

        let on_disk: Vec<HistoryEntry> = storage::read_json(rec.path()).unwrap().unwrap();
        assert_eq!(on_disk, rec.entries());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn skips_short_plays() {
        let root = temp_path("history_short");
        let mut rec = HistoryRecorder::started_at(&root, 10, start());
        rec.now_playing_at("s", &track("1"), start()).unwrap();
        let soon = start() + Duration::seconds(4);
        assert!(!rec.now_playing_at("s", &track("2"), soon).unwrap());
        assert!(rec.entries().is_empty());
        assert!(!rec.path().exists());
    }

    #[test]
    fn finish_records_last_track_once() {
        let root = temp_path("history_finish");
        let mut rec = HistoryRecorder::started_at(&root, 10, start());
        rec.now_playing_at("s", &track("1"), start()).unwrap();
        let end = start() + Duration::seconds(30);
        assert!(rec.finish_at(end).unwrap());
        assert!(!rec.finish_at(end).unwrap());
        assert_eq!(rec.entries().len(), 1);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn paused_time_does_not_count() {
        let root = temp_path("history_paused");
        let mut rec = HistoryRecorder::started_at(&root, 10, start());
        rec.now_playing_at("s", &track("1"), start()).unwrap();
        rec.pause_at(start() + Duration::seconds(5));
        rec.resume_at(start() + Duration::seconds(65));
        // 5s before the pause and 3s after it
        assert!(!rec.finish_at(start() + Duration::seconds(68)).unwrap());
        assert!(rec.entries().is_empty());
    }

    #[test]
    fn finishing_while_paused_stops_at_pause() {
        let root = temp_path("history_paused_end");
        let mut rec = HistoryRecorder::started_at(&root, 10, start());
        rec.now_playing_at("s", &track("1"), start()).unwrap();
        rec.pause_at(start() + Duration::seconds(40));
        rec.pause_at(start() + Duration::seconds(50));
        assert!(rec.finish_at(start() + Duration::seconds(300)).unwrap());
        assert_eq!(rec.entries()[0].played_secs, 40);
        let _ = std::fs::remove_dir_all(&root);
    }
}
