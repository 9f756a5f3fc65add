//! Configuration constants for the stationdeck engine

/// Playback engine timing
pub mod engine {
    /// Upper bound on waiting for a freshly loaded handle to report playing
    pub const START_TIMEOUT_SECS: u64 = 10;

    /// Interval between `is_playing` polls while starting
    pub const START_POLL_MS: u64 = 500;

    /// Delay after a pause/unpause before the playing state is sampled
    pub const PAUSE_SETTLE_MS: u64 = 100;

    /// Step used by forward/rewind on seekable stations (milliseconds)
    pub const SEEK_STEP_MS: i64 = 10_000;

    /// Event dispatcher and handle monitor tick
    pub const TICK_MS: u64 = 500;
}

/// Network-related configuration
pub mod network {
    /// User agent for HTTP requests
    pub const USER_AGENT: &str = concat!("stationdeck/", env!("CARGO_PKG_VERSION"));

    /// Connection timeout in seconds
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Read timeout in seconds
    pub const READ_TIMEOUT_SECS: u64 = 30;

    /// Maximum playlist resolution depth
    pub const MAX_PLAYLIST_DEPTH: usize = 5;
}

/// Retry policy for the remote track queue and live stream reconnects
pub mod queue {
    /// Base delay between retries in seconds (exponential backoff: 2^n * base)
    pub const RETRY_BASE_DELAY_SECS: u64 = 2;

    /// Maximum backoff delay in seconds
    pub const MAX_BACKOFF_SECS: u64 = 30;

    /// Tracks tried back to back before an automatic advance starts backing off
    pub const MAX_START_FAILURES: u32 = 3;
}

/// HLS-related configuration
pub mod hls {
    /// Number of segments to buffer
    pub const SEGMENT_BUFFER_SIZE: usize = 3;

    /// Segment download timeout in seconds
    pub const SEGMENT_TIMEOUT_SECS: u64 = 15;
}

/// Stream buffer configuration (producer-consumer)
pub mod buffer {
    /// Live streams hold at most this many unread bytes
    pub const MAX_BUFFER_SIZE: usize = 4 * 1024 * 1024;
    /// Compact a live buffer when consumed data exceeds this threshold (bytes)
    pub const COMPACTION_THRESHOLD: usize = 2 * 1024 * 1024;
    /// Bytes kept before the read cursor on compaction
    pub const COMPACTION_SAFETY_MARGIN: usize = 64 * 1024;
    /// Chunk size for producer reads from the network reader (bytes)
    pub const PRODUCER_CHUNK_SIZE: usize = 8 * 1024;
    /// Maximum time the consumer blocks per wait (milliseconds)
    pub const CONSUMER_WAIT_TIMEOUT_MS: u64 = 500;
}
