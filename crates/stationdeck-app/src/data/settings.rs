//! User settings
//!
//! Stored as `settings.json` in the config directory. Missing fields fall
//! back to defaults so older files keep loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::providers::{DEFAULT_SEARCH_LIMIT, IHEART_DEFAULT_MARKET_ID};
use crate::config::storage::{DEFAULT_HISTORY_MIN_SECS, SETTINGS_FILE};
use crate::data::storage;
use crate::error::Result;

/// Settings file format version for migrations
const SETTINGS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Overrides the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Record played tracks in per-session history files
    #[serde(default = "default_true")]
    pub track_history: bool,

    /// Seconds a track must play before it counts as played
    #[serde(default = "default_history_min_secs")]
    pub history_min_secs: u64,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// iHeart market used to boost search results
    #[serde(default = "default_market_id")]
    pub market_id: u32,

    /// Anonymous device id, generated on first run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_true() -> bool {
    true
}

fn default_history_min_secs() -> u64 {
    DEFAULT_HISTORY_MIN_SECS
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_market_id() -> u32 {
    IHEART_DEFAULT_MARKET_ID
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            data_dir: None,
            track_history: true,
            history_min_secs: DEFAULT_HISTORY_MIN_SECS,
            search_limit: DEFAULT_SEARCH_LIMIT,
            market_id: IHEART_DEFAULT_MARKET_ID,
            device_id: None,
        }
    }
}

impl Settings {
    /// Path of the settings file in the config directory
    pub fn default_path() -> Result<PathBuf> {
        Ok(storage::config_dir()?.join(SETTINGS_FILE))
    }

    /// Load settings from the config directory, or defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(storage::read_json(path)?.unwrap_or_default())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        storage::write_json(path, self)
    }

    /// Effective data directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        match self.data_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => storage::default_data_dir(),
        }
    }

    /// Return the device id, generating one if none is stored yet.
    /// Returns `true` in the second slot when a new id was generated.
    pub fn ensure_device_id(&mut self) -> (String, bool) {
        if let Some(ref id) = self.device_id {
            return (id.clone(), false);
        }
        let id = uuid::Uuid::new_v4().to_string();
        debug!(device_id = id.as_str(), "generated device id");
        self.device_id = Some(id.clone());
        (id, true)
    }
}
