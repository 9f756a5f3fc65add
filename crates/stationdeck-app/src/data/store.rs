//! JSON-file `Store`
//!
//! Layout under the data directory:
//!
//! ```text
//! last_played.json
//! playlists/<name>.playlist.json
//! ```

use std::path::PathBuf;

use stationdeck::station::StationDescriptor;
use stationdeck::store::{PlaylistRecord, Store};
use tracing::{debug, warn};

use crate::config::storage::{LAST_PLAYED_FILE, PLAYLIST_DIR, PLAYLIST_SUFFIX};
use crate::data::storage;
use crate::error::AppError;

pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn playlist_dir(&self) -> PathBuf {
        self.root.join(PLAYLIST_DIR)
    }

    fn playlist_path(&self, name: &str) -> PathBuf {
        self.playlist_dir()
            .join(format!("{}{}", file_stem(name), PLAYLIST_SUFFIX))
    }

    /// Load a single playlist by name
    pub fn load_playlist(&self, name: &str) -> stationdeck::Result<PlaylistRecord> {
        storage::read_json::<PlaylistRecord>(&self.playlist_path(name))?
            .ok_or_else(|| AppError::NotFound(format!("playlist {}", name)).into())
    }
}

/// Playlist names become file names. Path separators are percent-escaped,
/// and so is `%` itself, so distinct names never share a file.
fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' => stem.push_str("%25"),
            '/' => stem.push_str("%2F"),
            '\\' => stem.push_str("%5C"),
            '\0' => stem.push_str("%00"),
            c => stem.push(c),
        }
    }
    stem
}

impl Store for JsonStore {
    fn load_playlists(&self) -> stationdeck::Result<Vec<PlaylistRecord>> {
        let mut playlists = Vec::new();
        for path in storage::files_with_suffix(&self.playlist_dir(), PLAYLIST_SUFFIX)? {
            match storage::read_json::<PlaylistRecord>(&path) {
                Ok(Some(record)) => playlists.push(record),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "skipping unreadable playlist"),
            }
        }
        debug!(count = playlists.len(), "loaded playlists");
        Ok(playlists)
    }

    fn write_playlists(&self, playlists: &[PlaylistRecord]) -> stationdeck::Result<()> {
        for playlist in playlists {
            storage::write_json(&self.playlist_path(&playlist.name), playlist)?;
        }
        Ok(())
    }

    fn load_last_played(&self) -> stationdeck::Result<Option<StationDescriptor>> {
        Ok(storage::read_json(&self.root.join(LAST_PLAYED_FILE))?)
    }

    fn write_last_played(&self, station: &StationDescriptor) -> stationdeck::Result<()> {
        Ok(storage::write_json(&self.root.join(LAST_PLAYED_FILE), station)?)
    }
}
