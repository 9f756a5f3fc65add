//! HLS stream reader
//!
//! Downloads segments in the background, demuxes MPEG-TS, prepends the fMP4
//! init segment, and exposes the audio as a plain byte stream. Live playlists
//! are polled forever; VOD playlists end once every segment has been sent.

use std::collections::HashSet;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use m3u8_rs::Playlist;
use mpeg2ts::ts::{ReadTsPacket, TsPacketReader, TsPayload};
use tracing::{debug, warn};

use crate::backoff::Backoff;
use crate::config::hls::{SEGMENT_BUFFER_SIZE, SEGMENT_TIMEOUT_SECS};
use crate::config::network::{CONNECT_TIMEOUT_SECS, MAX_PLAYLIST_DEPTH, USER_AGENT};
use crate::error::{DeckError, Result};
use crate::stream::playlist::{get_base_url, make_absolute_url};

/// Detected segment container format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlsSegmentFormat {
    MpegTs,
    Fmp4,
    Raw,
}

/// A media playlist reached from a (possibly master) HLS URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlaylistUrl {
    pub url: String,
    pub base_url: String,
    /// No `EXT-X-ENDLIST` tag
    pub live: bool,
}

/// HLS reader fed by a background segment downloader
pub struct HlsReader {
    buffer: Cursor<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
    stop_flag: Arc<AtomicBool>,
    _handle: Option<JoinHandle<()>>,
    pub detected_format: HlsSegmentFormat,
}

impl HlsReader {
    /// Start downloading a media playlist and wait for the first segment
    pub fn new(playlist: &MediaPlaylistUrl) -> Result<Self> {
        let (sender, receiver) = bounded::<Vec<u8>>(SEGMENT_BUFFER_SIZE);
        let stop_flag = Arc::new(AtomicBool::new(false));

        let downloader = SegmentDownloader {
            media_url: playlist.url.clone(),
            base_url: playlist.base_url.clone(),
            sender,
            stop_flag: stop_flag.clone(),
        };
        let handle = thread::Builder::new()
            .name("hls-downloader".to_string())
            .spawn(move || {
                if let Err(e) = downloader.run() {
                    warn!(error = %e, "hls downloader stopped");
                }
            })
            .map_err(|e| {
                DeckError::StreamUnavailable(format!("Failed to spawn downloader: {}", e))
            })?;

        let initial_data = match receiver.recv_timeout(Duration::from_secs(SEGMENT_TIMEOUT_SECS * 2))
        {
            Ok(data) => data,
            Err(_) => {
                stop_flag.store(true, Ordering::SeqCst);
                return Err(DeckError::StreamUnavailable(
                    "Timeout waiting for first HLS segment".to_string(),
                ));
            }
        };
        let detected_format = detect_segment_format(&initial_data, &playlist.url);

        Ok(Self {
            buffer: Cursor::new(initial_data),
            receiver,
            stop_flag,
            _handle: Some(handle),
            detected_format,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_channel(receiver: Receiver<Vec<u8>>, initial_data: Vec<u8>) -> Self {
        Self {
            detected_format: detect_segment_format(&initial_data, "test.ts"),
            buffer: Cursor::new(initial_data),
            receiver,
            stop_flag: Arc::new(AtomicBool::new(false)),
            _handle: None,
        }
    }

    /// Replace the drained buffer with the next segment. `false` at end of stream.
    fn next_segment(&mut self) -> bool {
        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                return false;
            }
            match self
                .receiver
                .recv_timeout(Duration::from_secs(SEGMENT_TIMEOUT_SECS))
            {
                Ok(data) => {
                    self.buffer = Cursor::new(data);
                    return true;
                }
                // The downloader keeps retrying through network errors
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }
}

impl Read for HlsReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.buffer.read(buf)?;
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }
            if !self.next_segment() {
                return Ok(0);
            }
        }
    }
}

impl Drop for HlsReader {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

/// Detect the container format of an HLS segment from its data and URL
pub fn detect_segment_format(data: &[u8], url: &str) -> HlsSegmentFormat {
    if data.len() >= 8 {
        let magic = &data[4..8];
        if magic == b"ftyp" || magic == b"moof" || magic == b"moov" {
            return HlsSegmentFormat::Fmp4;
        }
    }

    if data.first() == Some(&0x47) {
        return HlsSegmentFormat::MpegTs;
    }

    let lower = url.to_lowercase();
    if lower.ends_with(".ts") || lower.contains(".ts?") {
        return HlsSegmentFormat::MpegTs;
    }
    if lower.ends_with(".m4s") || lower.contains(".m4s?") {
        return HlsSegmentFormat::Fmp4;
    }

    HlsSegmentFormat::Raw
}

/// Check if a segment URI looks like media rather than a stray tag value
pub fn is_valid_segment_uri(uri: &str) -> bool {
    let trimmed = uri.trim();
    if trimmed.is_empty() || trimmed.contains("=\"") || trimmed.contains("='") {
        return false;
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return true;
    }

    const MEDIA_EXTENSIONS: [&str; 5] = [".ts", ".aac", ".m4s", ".mp4", ".m4a"];
    let has_media_extension = MEDIA_EXTENSIONS
        .iter()
        .any(|ext| trimmed.ends_with(ext) || trimmed.contains(&format!("{}?", ext)));

    has_media_extension || trimmed.contains('/')
}

/// Demux an MPEG-TS segment and keep only the audio elementary streams
pub fn demux_ts_segment(ts_data: &[u8]) -> Vec<u8> {
    let mut audio_pids: HashSet<u16> = HashSet::new();

    let mut reader = TsPacketReader::new(Cursor::new(ts_data));
    while let Ok(Some(packet)) = reader.read_ts_packet() {
        if let Some(TsPayload::Pmt(pmt)) = packet.payload {
            for es in &pmt.es_info {
                // MPEG1/2 audio, AAC ADTS, AAC LOAS, private, AC-3
                if matches!(es.stream_type as u8, 0x03 | 0x04 | 0x0F | 0x11 | 0x80 | 0x81) {
                    audio_pids.insert(es.elementary_pid.as_u16());
                }
            }
        }
    }

    if audio_pids.is_empty() {
        audio_pids.extend([0x101, 0x102]);
    }

    let mut audio_data = Vec::new();
    let mut reader = TsPacketReader::new(Cursor::new(ts_data));
    while let Ok(Some(packet)) = reader.read_ts_packet() {
        if !audio_pids.contains(&packet.header.pid.as_u16()) {
            continue;
        }
        match packet.payload {
            Some(TsPayload::PesStart(pes)) => audio_data.extend_from_slice(pes.data.as_ref()),
            Some(TsPayload::PesContinuation(data)) => audio_data.extend_from_slice(data.as_ref()),
            Some(TsPayload::Raw(data)) => audio_data.extend_from_slice(data.as_ref()),
            _ => {}
        }
    }

    audio_data
}

/// Follow master playlists down to a media playlist
pub fn resolve_hls_url(url: &str) -> Result<MediaPlaylistUrl> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(SEGMENT_TIMEOUT_SECS))
        .build()?;

    resolve_hls_recursive(url, &client, MAX_PLAYLIST_DEPTH)
}

fn resolve_hls_recursive(
    url: &str,
    client: &reqwest::blocking::Client,
    depth: usize,
) -> Result<MediaPlaylistUrl> {
    if depth == 0 {
        return Err(DeckError::StreamUnavailable(
            "HLS playlist nesting too deep".to_string(),
        ));
    }

    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(DeckError::StreamUnavailable(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }

    let content = response.bytes()?;
    let base_url = get_base_url(url);

    match m3u8_rs::parse_playlist(&content) {
        Ok((_, Playlist::MasterPlaylist(master))) => {
            let variant = master.variants.first().ok_or_else(|| {
                DeckError::StreamUnavailable("No variants in master playlist".to_string())
            })?;
            let media_url = make_absolute_url(&variant.uri, &base_url);
            resolve_hls_recursive(&media_url, client, depth - 1)
        }
        Ok((_, Playlist::MediaPlaylist(media))) => Ok(MediaPlaylistUrl {
            url: url.to_string(),
            base_url,
            live: !media.end_list,
        }),
        Err(e) => Err(DeckError::Decode(format!("Playlist parse error: {:?}", e))),
    }
}

/// Outcome of fetching one media playlist
enum PlaylistFetch {
    Ok(m3u8_rs::MediaPlaylist),
    Retry,
}

/// Background segment downloader.
///
/// Segments are deduplicated by URL; some servers keep `EXT-X-MEDIA-SEQUENCE`
/// fixed while rotating segment URLs.
struct SegmentDownloader {
    media_url: String,
    base_url: String,
    sender: Sender<Vec<u8>>,
    stop_flag: Arc<AtomicBool>,
}

impl SegmentDownloader {
    fn stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    fn fetch_playlist(&self, client: &reqwest::blocking::Client) -> Result<PlaylistFetch> {
        let response = match client.get(&self.media_url).send() {
            Ok(r) if r.status().is_success() => r,
            _ => return Ok(PlaylistFetch::Retry),
        };
        let Ok(content) = response.bytes() else {
            return Ok(PlaylistFetch::Retry);
        };
        match m3u8_rs::parse_playlist(&content) {
            Ok((_, Playlist::MediaPlaylist(pl))) => Ok(PlaylistFetch::Ok(pl)),
            Ok(_) => Err(DeckError::Decode("Expected media playlist".to_string())),
            Err(_) => Ok(PlaylistFetch::Retry),
        }
    }

    fn run(self) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(SEGMENT_TIMEOUT_SECS * 2))
            .build()?;

        let backoff = Backoff::default();
        let mut downloaded_urls: HashSet<String> = HashSet::new();
        let mut first_fetch = true;
        let mut sent_first = false;
        let mut init_segment: Option<Vec<u8>> = None;
        let mut consecutive_failures: u32 = 0;

        loop {
            if self.stopped() {
                return Ok(());
            }

            let playlist = match self.fetch_playlist(&client)? {
                PlaylistFetch::Ok(pl) => pl,
                PlaylistFetch::Retry => {
                    consecutive_failures += 1;
                    warn!(url = self.media_url.as_str(), attempt = consecutive_failures, "playlist refresh failed");
                    if !backoff.sleep(consecutive_failures, &self.stop_flag) {
                        return Ok(());
                    }
                    continue;
                }
            };
            consecutive_failures = 0;

            let is_live = !playlist.end_list;

            if init_segment.is_none() && !sent_first {
                if let Some(map) = playlist.segments.first().and_then(|s| s.map.as_ref()) {
                    let map_url = make_absolute_url(&map.uri, &self.base_url);
                    if let Ok(resp) = client.get(&map_url).send() {
                        if resp.status().is_success() {
                            init_segment = resp.bytes().ok().map(|b| b.to_vec());
                        }
                    }
                }
            }

            // Live: start a few segments back so the channel fills immediately
            let start_idx = if first_fetch && is_live {
                playlist
                    .segments
                    .len()
                    .saturating_sub(SEGMENT_BUFFER_SIZE.min(playlist.segments.len()))
            } else {
                0
            };
            first_fetch = false;

            let mut fetched_new = false;

            for segment in playlist.segments.iter().skip(start_idx) {
                if self.stopped() {
                    return Ok(());
                }
                if !is_valid_segment_uri(&segment.uri) {
                    continue;
                }

                let segment_url = make_absolute_url(&segment.uri, &self.base_url);
                if !downloaded_urls.insert(segment_url.clone()) {
                    continue;
                }
                fetched_new = true;

                // A failed segment stays marked as downloaded; live content
                // moves on and a late retry would only glitch
                let data = match client.get(&segment_url).send() {
                    Ok(resp) if resp.status().is_success() => match resp.bytes() {
                        Ok(b) => b,
                        Err(_) => continue,
                    },
                    _ => {
                        debug!(url = segment_url.as_str(), "segment fetch failed");
                        continue;
                    }
                };

                let audio_data = match detect_segment_format(&data, &segment_url) {
                    HlsSegmentFormat::MpegTs if data.first() == Some(&0x47) => {
                        demux_ts_segment(&data)
                    }
                    HlsSegmentFormat::Fmp4 if !sent_first => match init_segment.take() {
                        Some(mut combined) => {
                            combined.extend_from_slice(&data);
                            combined
                        }
                        None => data.to_vec(),
                    },
                    _ => data.to_vec(),
                };

                if audio_data.is_empty() {
                    continue;
                }
                if self.stopped() || self.sender.send(audio_data).is_err() {
                    return Ok(());
                }
                sent_first = true;
            }

            // Forget URLs that scrolled out of the live window
            let current_urls: HashSet<String> = playlist
                .segments
                .iter()
                .map(|s| make_absolute_url(&s.uri, &self.base_url))
                .collect();
            downloaded_urls.retain(|url| current_urls.contains(url));

            if !is_live {
                debug!(url = self.media_url.as_str(), "vod playlist complete");
                return Ok(());
            }

            // RFC 8216 6.3.4: reload after target duration, half if unchanged
            let base = (playlist.target_duration as u64).max(2);
            let wait = if fetched_new { base } else { base / 2 };
            thread::sleep(Duration::from_secs(wait));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_fmp4_boxes() {
        for magic in [b"ftyp", b"moof", b"moov"] {
            let mut data = vec![0x00, 0x00, 0x00, 0x20];
            data.extend_from_slice(magic);
            assert_eq!(detect_segment_format(&data, "unknown"), HlsSegmentFormat::Fmp4);
        }
    }

    #[test]
    fn detects_ts_by_sync_byte_or_extension() {
        assert_eq!(
            detect_segment_format(&[0x47, 0, 0, 0], "unknown"),
            HlsSegmentFormat::MpegTs
        );
        assert_eq!(
            detect_segment_format(&[0xFF, 0xFB], "http://a/seg.ts?token=abc"),
            HlsSegmentFormat::MpegTs
        );
        assert_eq!(
            detect_segment_format(&[0xFF, 0xFB], "http://a/seg.m4s"),
            HlsSegmentFormat::Fmp4
        );
        assert_eq!(
            detect_segment_format(&[0xFF, 0xF1], "http://a/seg.aac"),
            HlsSegmentFormat::Raw
        );
    }

    #[test]
    fn segment_uri_validation() {
        assert!(is_valid_segment_uri("seg001.ts"));
        assert!(is_valid_segment_uri("chunks/00042"));
        assert!(is_valid_segment_uri("https://cdn.example.com/x"));
        assert!(is_valid_segment_uri("audio.aac?t=1"));
        assert!(!is_valid_segment_uri(""));
        assert!(!is_valid_segment_uri("   "));
        assert!(!is_valid_segment_uri("TITLE=\"Song\""));
        assert!(!is_valid_segment_uri("garbage"));
    }

    #[test]
    fn demux_of_non_ts_data_is_empty() {
        assert!(demux_ts_segment(&[]).is_empty());
        assert!(demux_ts_segment(&[0xFF; 64]).is_empty());
    }

    #[test]
    fn reader_concatenates_segments_then_ends() {
        let (tx, rx) = bounded(4);
        let mut reader = HlsReader::from_channel(rx, b"one-".to_vec());
        tx.send(b"two-".to_vec()).unwrap();
        tx.send(b"three".to_vec()).unwrap();
        drop(tx);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"one-two-three");
    }

    #[test]
    fn stopped_reader_reports_eof() {
        let (_tx, rx) = bounded::<Vec<u8>>(1);
        let mut reader = HlsReader::from_channel(rx, Vec::new());
        reader.stop_flag.store(true, Ordering::SeqCst);
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }
}
