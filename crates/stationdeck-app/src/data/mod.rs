//! Data persistence
//!
//! Settings, playlists, last-played state and session history.

pub mod history;
pub mod settings;
pub mod storage;
pub mod store;

pub use history::{HistoryEntry, HistoryRecorder};
pub use settings::Settings;
pub use store::JsonStore;
