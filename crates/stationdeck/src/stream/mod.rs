//! Stream handling
//!
//! Handles different stream types: HLS, ICY (Icecast/Shoutcast), direct files.
//! Resolves locators (PLS/M3U playlists, HLS detection), connects to streams,
//! extracts ICY metadata, downloads HLS segments with MPEG-TS demuxing, and
//! buffers everything behind a seekable reader for the decoder.

pub mod buffer;
pub mod hls;
pub mod icy;
pub mod metadata;
pub mod playlist;
pub mod resolver;
pub mod types;

pub use buffer::{StreamBuffer, StreamBufferReader};
pub use metadata::StreamMetadata;
pub use resolver::StreamResolver;
pub use types::{ResolvedStream, StreamInfo, StreamType};
