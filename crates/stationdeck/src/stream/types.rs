//! Stream types

use std::io::Read;

use crossbeam_channel::Receiver;

use crate::stream::metadata::StreamMetadata;

/// Type of resolved stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Direct,
    Hls,
}

/// Information about a resolved stream
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub original_url: String,
    pub resolved_url: String,
    pub stream_type: StreamType,
    pub format_hint: Option<String>,
    pub content_type: Option<String>,
    pub station_name: Option<String>,
    /// Total length, for finite media served with Content-Length
    pub content_length: Option<u64>,
    /// Live streams never end on their own and cannot be seeked
    pub live: bool,
}

/// A resolved stream ready for buffering and decoding
pub struct ResolvedStream {
    pub reader: Box<dyn Read + Send>,
    pub metadata_rx: Option<Receiver<StreamMetadata>>,
    pub info: StreamInfo,
}
