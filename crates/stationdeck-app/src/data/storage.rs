//! JSON file helpers
//!
//! Every persisted file goes through here so that I/O failures carry the
//! path and a readable reason.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::app::NAME;
use crate::error::{AppError, Result};

/// Directory holding `settings.json`
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(NAME))
        .ok_or_else(|| AppError::Config("Could not determine config directory".to_string()))
}

/// Default root for playlists, history and last-played state
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(NAME))
        .ok_or_else(|| AppError::Config("Could not determine data directory".to_string()))
}

fn io_error(action: &str, path: &Path, e: io::Error) -> AppError {
    let reason = match e.kind() {
        ErrorKind::PermissionDenied => "permission denied".to_string(),
        ErrorKind::ReadOnlyFilesystem => "filesystem is read-only".to_string(),
        ErrorKind::NotFound => "parent path does not exist".to_string(),
        _ => e.to_string(),
    };
    AppError::Config(format!("Cannot {} {:?}: {}", action, path, reason))
}

/// Create a directory and its parents
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| io_error("create directory", path, e))
}

/// Read and parse a JSON file.
///
/// A missing or blank file is `None`; unparsable content is an error.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error("read", path, e)),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| AppError::Config(format!("Failed to parse {:?}: {}", path, e)))
}

/// Write `data` as pretty JSON, creating parent directories
pub fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let content = serde_json::to_string_pretty(data)
        .map_err(|e| AppError::Config(format!("Failed to serialize {:?}: {}", path, e)))?;
    fs::write(path, content).map_err(|e| io_error("write", path, e))
}

/// Files in `dir` whose names end with `suffix`, sorted by name.
/// A missing directory has no files.
pub fn files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error("list", dir, e)),
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(suffix))
        })
        .collect();
    files.sort();
    Ok(files)
}
