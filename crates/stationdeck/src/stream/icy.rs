//! ICY stream reader
//!
//! Connects to Icecast/Shoutcast (or plain HTTP) streams, strips interleaved
//! ICY metadata, and hands audio bytes to the buffer through a channel.
//! Live streams reconnect with backoff; finite files end at EOF.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::backoff::Backoff;
use crate::config::network::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, USER_AGENT};
use crate::error::{DeckError, Result};
use crate::stream::metadata::{extract_icy_title, StreamMetadata};

const AUDIO_CHANNEL_BOUND: usize = 32;
const CHUNK_SIZE: usize = 8192;

/// Headers parsed from an ICY stream response
#[derive(Debug, Clone, Default)]
pub struct IcyHeaders {
    pub metaint: usize,
    pub station_name: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl IcyHeaders {
    /// Streams without a known length are treated as live
    pub fn is_live(&self) -> bool {
        self.content_length.is_none()
    }
}

/// ICY reader that strips metadata and passes audio through
pub struct IcyReader {
    current_chunk: Vec<u8>,
    chunk_pos: usize,
    receiver: Receiver<Vec<u8>>,
    stop_flag: Arc<AtomicBool>,
    _handle: Option<JoinHandle<()>>,
    pub headers: IcyHeaders,
}

impl IcyReader {
    /// Connect with ICY metadata requested and start the background reader.
    ///
    /// Returns the reader and a channel of metadata updates.
    pub fn new(url: &str) -> Result<(Self, Receiver<StreamMetadata>)> {
        let client = http_client()?;
        let response = client.get(url).header("Icy-MetaData", "1").send()?;
        if !response.status().is_success() {
            return Err(DeckError::StreamUnavailable(format!(
                "HTTP {} for {}",
                response.status(),
                url
            )));
        }

        let headers = parse_icy_headers(&response);
        debug!(
            url,
            metaint = headers.metaint,
            live = headers.is_live(),
            "icy stream connected"
        );

        let (audio_tx, audio_rx) = bounded::<Vec<u8>>(AUDIO_CHANNEL_BOUND);
        let (metadata_tx, metadata_rx) = crossbeam_channel::unbounded::<StreamMetadata>();
        let stop_flag = Arc::new(AtomicBool::new(false));

        let worker = IcyWorker {
            url: url.to_string(),
            client,
            metaint: headers.metaint,
            live: headers.is_live(),
            metadata_tx,
            audio_tx,
            stop_flag: stop_flag.clone(),
        };
        let handle = thread::Builder::new()
            .name("icy-reader".to_string())
            .spawn(move || worker.run(response))
            .map_err(|e| DeckError::StreamUnavailable(format!("Failed to spawn reader: {}", e)))?;

        Ok((
            Self {
                current_chunk: Vec::new(),
                chunk_pos: 0,
                receiver: audio_rx,
                stop_flag,
                _handle: Some(handle),
                headers,
            },
            metadata_rx,
        ))
    }
}

impl Read for IcyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let remaining = self.current_chunk.len() - self.chunk_pos;
            if remaining > 0 {
                let n = buf.len().min(remaining);
                buf[..n].copy_from_slice(&self.current_chunk[self.chunk_pos..self.chunk_pos + n]);
                self.chunk_pos += n;
                return Ok(n);
            }

            // The worker may be reconnecting; only a closed channel means EOF
            match self
                .receiver
                .recv_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            {
                Ok(chunk) => {
                    self.current_chunk = chunk;
                    self.chunk_pos = 0;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.stop_flag.load(Ordering::Relaxed) {
                        return Ok(0);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
    }
}

impl Drop for IcyReader {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

fn http_client() -> Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(None)
        .build()?)
}

fn parse_icy_headers(response: &reqwest::blocking::Response) -> IcyHeaders {
    let headers = response.headers();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
    };

    IcyHeaders {
        metaint: header("icy-metaint")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        station_name: header("icy-name"),
        content_type: header("content-type"),
        content_length: response.content_length(),
    }
}

enum ReadResult {
    Ok,
    Eof,
    Error,
    ChannelClosed,
}

/// Splits audio from interleaved metadata blocks
struct IcyDemuxer {
    metaint: usize,
    bytes_until_meta: usize,
    last_title: String,
    chunk: Vec<u8>,
}

impl IcyDemuxer {
    fn new(metaint: usize) -> Self {
        Self {
            metaint,
            bytes_until_meta: metaint,
            last_title: String::new(),
            chunk: vec![0u8; CHUNK_SIZE],
        }
    }

    fn reset(&mut self) {
        self.bytes_until_meta = self.metaint;
    }

    /// Read one audio chunk, consuming a metadata block when one is due
    fn read_chunk<R: Read>(
        &mut self,
        source: &mut R,
        audio_tx: &Sender<Vec<u8>>,
        metadata_tx: &Sender<StreamMetadata>,
    ) -> ReadResult {
        let to_read = if self.metaint == 0 {
            self.chunk.len()
        } else {
            self.chunk.len().min(self.bytes_until_meta)
        };

        if to_read > 0 {
            match source.read(&mut self.chunk[..to_read]) {
                Ok(0) => return ReadResult::Eof,
                Ok(n) => {
                    if audio_tx.send(self.chunk[..n].to_vec()).is_err() {
                        return ReadResult::ChannelClosed;
                    }
                    if self.metaint > 0 {
                        self.bytes_until_meta -= n;
                    }
                }
                Err(_) => return ReadResult::Error,
            }
        }

        if self.metaint > 0 && self.bytes_until_meta == 0 {
            let mut len_byte = [0u8; 1];
            if source.read_exact(&mut len_byte).is_err() {
                return ReadResult::Error;
            }
            let meta_len = len_byte[0] as usize * 16;
            if meta_len > 0 {
                let mut meta_buf = vec![0u8; meta_len];
                if source.read_exact(&mut meta_buf).is_err() {
                    return ReadResult::Error;
                }
                if let Some(title) = extract_icy_title(&meta_buf) {
                    if title != self.last_title {
                        let _ = metadata_tx.send(StreamMetadata::from_icy_title(&title));
                        self.last_title = title;
                    }
                }
            }
            self.bytes_until_meta = self.metaint;
        }

        ReadResult::Ok
    }
}

struct IcyWorker {
    url: String,
    client: reqwest::blocking::Client,
    metaint: usize,
    live: bool,
    metadata_tx: Sender<StreamMetadata>,
    audio_tx: Sender<Vec<u8>>,
    stop_flag: Arc<AtomicBool>,
}

impl IcyWorker {
    fn run(self, mut response: reqwest::blocking::Response) {
        let mut demux = IcyDemuxer::new(self.metaint);
        let backoff = Backoff::default();
        let mut consecutive_failures: u32 = 0;

        loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                return;
            }

            match demux.read_chunk(&mut response, &self.audio_tx, &self.metadata_tx) {
                ReadResult::Ok => consecutive_failures = 0,
                ReadResult::ChannelClosed => return,
                ReadResult::Eof | ReadResult::Error if !self.live => return,
                ReadResult::Eof | ReadResult::Error => loop {
                    consecutive_failures += 1;
                    warn!(url = self.url.as_str(), attempt = consecutive_failures, "stream dropped, reconnecting");
                    if !backoff.sleep(consecutive_failures, &self.stop_flag) {
                        return;
                    }
                    if let Some(resp) = self.reconnect() {
                        response = resp;
                        demux.reset();
                        break;
                    }
                },
            }
        }
    }

    fn reconnect(&self) -> Option<reqwest::blocking::Response> {
        if self.stop_flag.load(Ordering::SeqCst) {
            return None;
        }
        match self.client.get(&self.url).header("Icy-MetaData", "1").send() {
            Ok(resp) if resp.status().is_success() => Some(resp),
            _ => None,
        }
    }
}
