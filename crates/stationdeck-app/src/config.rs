//! Configuration constants for stationdeck app services

/// Application metadata
pub mod app {
    /// Application name (used for config directory, etc.)
    pub const NAME: &str = "stationdeck";
}

/// Provider-related configuration
pub mod providers {
    /// iHeart public API root
    pub const IHEART_API_BASE: &str = "https://us.api.iheart.com";

    /// Host name the iHeart web client reports
    pub const IHEART_HOST_NAME: &str = "webapp.US";

    /// Market used to boost search results when none is configured
    pub const IHEART_DEFAULT_MARKET_ID: u32 = 159;

    /// Default Radio Browser API server
    pub const RADIO_BROWSER_DEFAULT_SERVER: &str = "https://de1.api.radio-browser.info";

    /// Default number of search results per page
    pub const DEFAULT_SEARCH_LIMIT: usize = 10;

    /// Built-in relay station
    pub const RELAY_ID: &str = "anonradio";
    pub const RELAY_NAME: &str = "aNONradio";
    pub const RELAY_URL: &str = "http://anonradio.net:8000/anonradio";
}

/// On-disk layout under the data directory
pub mod storage {
    /// Settings file in the config directory
    pub const SETTINGS_FILE: &str = "settings.json";

    pub const LAST_PLAYED_FILE: &str = "last_played.json";

    pub const PLAYLIST_DIR: &str = "playlists";

    /// Suffix of one playlist file: `<name>.playlist.json`
    pub const PLAYLIST_SUFFIX: &str = ".playlist.json";

    pub const HISTORY_DIR: &str = "history";

    /// Seconds a track must play before it is recorded in history
    pub const DEFAULT_HISTORY_MIN_SECS: u64 = 10;
}
