//! Stream resolver
//!
//! Follows playlists, detects HLS, and returns a `ResolvedStream` ready for
//! buffering and decoding.

use tracing::debug;

use crate::error::Result;
use crate::stream::hls::{resolve_hls_url, HlsReader, HlsSegmentFormat};
use crate::stream::icy::IcyReader;
use crate::stream::playlist::{check_playlist_type, resolve_playlist_url, PlaylistCheck};
use crate::stream::types::{ResolvedStream, StreamInfo, StreamType};

/// Content types and the decoder hint each maps to
const CONTENT_TYPE_HINTS: &[(&str, &str)] = &[
    ("audio/mpeg", "mp3"),
    ("audio/mp3", "mp3"),
    ("audio/aac", "aac"),
    ("audio/aacp", "aac"),
    ("audio/ogg", "ogg"),
    ("application/ogg", "ogg"),
    ("audio/flac", "flac"),
    ("audio/opus", "opus"),
    ("audio/mp4", "mp4"),
    ("audio/x-m4a", "mp4"),
];

/// File extensions and the decoder hint each maps to
const EXTENSION_HINTS: &[(&str, &str)] = &[
    ("mp3", "mp3"),
    ("aac", "aac"),
    ("adts", "aac"),
    ("ogg", "ogg"),
    ("oga", "ogg"),
    ("opus", "opus"),
    ("flac", "flac"),
    ("m4a", "mp4"),
    ("mp4", "mp4"),
];

/// Resolves a locator into a readable stream
pub struct StreamResolver;

impl StreamResolver {
    /// Resolve a locator.
    ///
    /// 1. Follow PLS/M3U playlist chains
    /// 2. `.m3u8` → media playlist → HlsReader
    /// 3. Otherwise → IcyReader (works for ICY and plain HTTP servers)
    pub fn resolve(url: &str) -> Result<ResolvedStream> {
        let resolved_url = resolve_playlist_url(url)?;

        if check_playlist_type(&resolved_url) == PlaylistCheck::Hls {
            let playlist = resolve_hls_url(&resolved_url)?;
            let reader = HlsReader::new(&playlist)?;
            let format_hint = match reader.detected_format {
                HlsSegmentFormat::Fmp4 => "mp4",
                HlsSegmentFormat::MpegTs | HlsSegmentFormat::Raw => "aac",
            };
            debug!(url, media = playlist.url.as_str(), live = playlist.live, "resolved hls stream");

            return Ok(ResolvedStream {
                reader: Box::new(reader),
                metadata_rx: None,
                info: StreamInfo {
                    original_url: url.to_string(),
                    resolved_url: playlist.url,
                    stream_type: StreamType::Hls,
                    format_hint: Some(format_hint.to_string()),
                    content_type: None,
                    station_name: None,
                    content_length: None,
                    live: playlist.live,
                },
            });
        }

        let (reader, metadata_rx) = IcyReader::new(&resolved_url)?;
        let headers = reader.headers.clone();
        let format_hint = Self::detect_format_hint(&resolved_url, headers.content_type.as_deref());
        debug!(url, hint = ?format_hint, live = headers.is_live(), "resolved direct stream");

        Ok(ResolvedStream {
            reader: Box::new(reader),
            metadata_rx: Some(metadata_rx),
            info: StreamInfo {
                original_url: url.to_string(),
                resolved_url,
                stream_type: StreamType::Direct,
                format_hint,
                live: headers.is_live(),
                content_type: headers.content_type,
                station_name: headers.station_name,
                content_length: headers.content_length,
            },
        })
    }

    /// Decoder hint from the content type, falling back to the URL extension
    pub fn detect_format_hint(url: &str, content_type: Option<&str>) -> Option<String> {
        if let Some(ct) = content_type {
            let ct = ct.to_lowercase();
            if let Some((_, hint)) = CONTENT_TYPE_HINTS.iter().find(|(t, _)| ct.contains(t)) {
                return Some(hint.to_string());
            }
        }

        let lower = url.to_lowercase();
        let path = lower.split('?').next().unwrap_or(&lower);
        let file = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = file.rsplit_once('.')?;
        EXTENSION_HINTS
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, hint)| hint.to_string())
    }
}
