//! Decoupled producer-consumer stream buffer
//!
//! A background producer thread reads from the network reader (IcyReader/HlsReader)
//! and fills a shared buffer. The consumer (StreamBufferReader) implements Read + Seek
//! and is handed to the decoder, so network stalls don't stall decoding.
//!
//! Live buffers compact consumed data and cap their size. Finite buffers keep
//! everything, which lets the decoder seek anywhere in the downloaded media.
//!
//!   Network → IcyReader/HlsReader
//!                  ↓ (producer thread reads chunks)
//!            SharedBuffer (`Vec<u8>` + Mutex + Condvar)
//!                  ↓ (consumer: Read+Seek impl)
//!            StreamBufferReader → Decoder → Player

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::config::buffer::{
    COMPACTION_SAFETY_MARGIN, COMPACTION_THRESHOLD, CONSUMER_WAIT_TIMEOUT_MS, MAX_BUFFER_SIZE,
    PRODUCER_CHUNK_SIZE,
};
use crate::error::{DeckError, Result};

/// Shared mutable state behind Mutex
struct BufferInner {
    data: Vec<u8>,
    /// Total bytes discarded by compaction (absolute offset of data[0])
    base_offset: u64,
    /// Producer finished (EOF or error)
    producer_done: bool,
    producer_error: Option<String>,
}

impl BufferInner {
    fn abs_end(&self) -> u64 {
        self.base_offset + self.data.len() as u64
    }
}

struct BufferState {
    inner: Mutex<BufferInner>,
    data_available: Condvar,
    stop_flag: Arc<AtomicBool>,
    live: bool,
}

impl BufferState {
    fn lock(&self) -> MutexGuard<'_, BufferInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn finish(&self, error: Option<String>) {
        let mut inner = self.lock();
        inner.producer_done = true;
        inner.producer_error = error;
        drop(inner);
        self.data_available.notify_all();
    }
}

/// Creates a decoupled producer-consumer stream buffer.
pub struct StreamBuffer;

#[allow(clippy::new_ret_no_self)]
impl StreamBuffer {
    /// Start a producer thread over `reader`.
    ///
    /// Returns the consumer and the producer's stop flag. Dropping the
    /// consumer also stops the producer.
    pub fn new(
        reader: Box<dyn Read + Send>,
        live: bool,
    ) -> Result<(StreamBufferReader, Arc<AtomicBool>)> {
        let stop_flag = Arc::new(AtomicBool::new(false));

        let state = Arc::new(BufferState {
            inner: Mutex::new(BufferInner {
                data: Vec::with_capacity(PRODUCER_CHUNK_SIZE * 16),
                base_offset: 0,
                producer_done: false,
                producer_error: None,
            }),
            data_available: Condvar::new(),
            stop_flag: stop_flag.clone(),
            live,
        });

        let producer_state = state.clone();
        thread::Builder::new()
            .name("stream-buffer-producer".to_string())
            .spawn(move || Self::producer_loop(reader, producer_state))
            .map_err(|e| DeckError::Audio(format!("Failed to spawn buffer producer: {}", e)))?;

        Ok((StreamBufferReader { state, read_pos: 0 }, stop_flag))
    }

    fn producer_loop(mut reader: Box<dyn Read + Send>, state: Arc<BufferState>) {
        let mut chunk = vec![0u8; PRODUCER_CHUNK_SIZE];

        loop {
            if state.stop_flag.load(Ordering::Relaxed) {
                state.finish(None);
                return;
            }

            let n = match reader.read(&mut chunk) {
                Ok(0) => {
                    debug!("stream buffer producer reached end of stream");
                    state.finish(None);
                    return;
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    state.finish(Some(e.to_string()));
                    return;
                }
            };

            // Hold this chunk until there is room; re-reading first would lose it
            loop {
                if state.stop_flag.load(Ordering::Relaxed) {
                    state.finish(None);
                    return;
                }
                let mut inner = state.lock();
                if state.live && inner.data.len() >= MAX_BUFFER_SIZE {
                    drop(inner);
                    thread::sleep(Duration::from_millis(10));
                    continue;
                }
                inner.data.extend_from_slice(&chunk[..n]);
                drop(inner);
                state.data_available.notify_all();
                break;
            }
        }
    }
}

/// Consumer side: implements Read + Seek for the decoder.
pub struct StreamBufferReader {
    state: Arc<BufferState>,
    /// Absolute read position (across compactions)
    read_pos: u64,
}

impl StreamBufferReader {
    /// Drop consumed data from a live buffer, keeping a margin for short seeks back
    fn maybe_compact(&self, inner: &mut BufferInner) {
        if !self.state.live {
            return;
        }
        let local_read = (self.read_pos - inner.base_offset) as usize;
        if local_read > COMPACTION_THRESHOLD {
            let keep_from = local_read.saturating_sub(COMPACTION_SAFETY_MARGIN);
            inner.data.drain(..keep_from);
            inner.base_offset += keep_from as u64;
        }
    }

    /// Wait until `ready` holds, the producer finishes, or the buffer is stopped.
    fn wait_until<'a>(
        &self,
        mut inner: MutexGuard<'a, BufferInner>,
        ready: impl Fn(&BufferInner) -> bool,
    ) -> MutexGuard<'a, BufferInner> {
        let timeout = Duration::from_millis(CONSUMER_WAIT_TIMEOUT_MS);
        while !ready(&inner)
            && !inner.producer_done
            && !self.state.stop_flag.load(Ordering::Relaxed)
        {
            inner = match self.state.data_available.wait_timeout(inner, timeout) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
        inner
    }
}

impl Read for StreamBufferReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // Never return Ok(0) while the producer is alive: the decoder reads that as EOF
        let read_pos = self.read_pos;
        let mut inner = self.wait_until(self.state.lock(), |inner| inner.abs_end() > read_pos);

        let local_read = (self.read_pos - inner.base_offset) as usize;
        let available = inner.data.len().saturating_sub(local_read);

        if available == 0 {
            if let Some(ref err_msg) = inner.producer_error {
                return Err(io::Error::other(err_msg.clone()));
            }
            return Ok(0);
        }

        let to_copy = available.min(buf.len());
        buf[..to_copy].copy_from_slice(&inner.data[local_read..local_read + to_copy]);
        self.read_pos += to_copy as u64;
        self.maybe_compact(&mut inner);
        Ok(to_copy)
    }
}

impl Seek for StreamBufferReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let mut inner = self.state.lock();

        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => self.read_pos as i64 + offset,
            SeekFrom::End(offset) => {
                if self.state.live {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        "Live streams have no end",
                    ));
                }
                inner = self.wait_until(inner, |_| false);
                inner.abs_end() as i64 + offset
            }
        };

        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Seek to negative position",
            ));
        }
        let new_pos = new_pos as u64;

        if new_pos < inner.base_offset {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Cannot seek to {}: data before {} has been discarded",
                    new_pos, inner.base_offset
                ),
            ));
        }

        // Finite media: a forward seek waits for the download to catch up
        if !self.state.live {
            inner = self.wait_until(inner, |inner| inner.abs_end() >= new_pos);
        }

        self.read_pos = new_pos.min(inner.abs_end());
        Ok(self.read_pos)
    }
}

impl Drop for StreamBufferReader {
    fn drop(&mut self) {
        self.state.stop_flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Instant;

    fn finite(data: Vec<u8>) -> StreamBufferReader {
        StreamBuffer::new(Box::new(Cursor::new(data)), false).unwrap().0
    }

    fn drain(reader: &mut StreamBufferReader) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    /// Delivers its data slowly in small pieces
    struct SlowReader {
        data: Cursor<Vec<u8>>,
        delay: Duration,
    }

    impl Read for SlowReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            thread::sleep(self.delay);
            let limit = buf.len().min(1024);
            self.data.read(&mut buf[..limit])
        }
    }

    struct FailAfterReader {
        remaining: usize,
    }

    impl Read for FailAfterReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "simulated network error",
                ));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(42);
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn reads_all_data_in_order() {
        let data: Vec<u8> = (0..100_000).map(|i| (i % 256) as u8).collect();
        let mut reader = finite(data.clone());
        assert_eq!(drain(&mut reader), data);
    }

    #[test]
    fn empty_source_is_eof() {
        let mut reader = finite(Vec::new());
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn slow_producer_still_delivers_everything() {
        let data: Vec<u8> = (0..8_000).map(|i| (i % 251) as u8).collect();
        let slow = SlowReader {
            data: Cursor::new(data.clone()),
            delay: Duration::from_millis(2),
        };
        let (mut reader, _stop) = StreamBuffer::new(Box::new(slow), true).unwrap();
        assert_eq!(drain(&mut reader), data);
    }

    #[test]
    fn finite_buffer_seeks_back_to_start() {
        let data: Vec<u8> = (0..50_000).map(|i| (i % 256) as u8).collect();
        let mut reader = finite(data.clone());
        let first = drain(&mut reader);
        assert_eq!(first.len(), data.len());

        assert_eq!(reader.seek(SeekFrom::Start(0)).unwrap(), 0);
        let mut buf = [0u8; 10];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, &data[..10]);

        assert_eq!(reader.seek(SeekFrom::Current(-5)).unwrap(), 5);
        assert_eq!(reader.seek(SeekFrom::End(-1)).unwrap(), 49_999);
    }

    #[test]
    fn finite_forward_seek_waits_for_download() {
        let data: Vec<u8> = (0..20_000).map(|i| (i % 256) as u8).collect();
        let slow = SlowReader {
            data: Cursor::new(data.clone()),
            delay: Duration::from_millis(1),
        };
        let (mut reader, _stop) = StreamBuffer::new(Box::new(slow), false).unwrap();
        assert_eq!(reader.seek(SeekFrom::Start(15_000)).unwrap(), 15_000);
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, &data[15_000..15_004]);
    }

    #[test]
    fn live_buffer_refuses_seek_from_end() {
        let (mut reader, _stop) =
            StreamBuffer::new(Box::new(Cursor::new(vec![1u8; 100])), true).unwrap();
        assert!(reader.seek(SeekFrom::End(0)).is_err());
        assert!(reader.seek(SeekFrom::Current(-1)).is_err());
    }

    #[test]
    fn live_buffer_compacts_consumed_data() {
        let size = COMPACTION_THRESHOLD + 200_000;
        let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
        let (mut reader, _stop) =
            StreamBuffer::new(Box::new(Cursor::new(data.clone())), true).unwrap();

        let mut buf = [0u8; 8192];
        let mut total = 0;
        while total < COMPACTION_THRESHOLD + 100_000 {
            total += reader.read(&mut buf).unwrap();
        }
        assert!(reader.state.lock().base_offset > 0);

        assert!(reader.seek(SeekFrom::Start(0)).is_err());

        let pos = reader.read_pos as usize;
        assert_eq!(drain(&mut reader), &data[pos..]);
    }

    #[test]
    fn producer_error_surfaces_after_buffered_bytes() {
        let (mut reader, _stop) =
            StreamBuffer::new(Box::new(FailAfterReader { remaining: 500 }), true).unwrap();

        let mut total = 0;
        let mut buf = [0u8; 128];
        let err = loop {
            match reader.read(&mut buf) {
                Ok(0) => panic!("expected an error"),
                Ok(n) => total += n,
                Err(e) => break e,
            }
        };
        assert_eq!(total, 500);
        assert!(err.to_string().contains("simulated network error"));
    }

    #[test]
    fn stop_flag_unblocks_reader() {
        let endless = SlowReader {
            data: Cursor::new(Vec::new()),
            delay: Duration::from_secs(60),
        };
        let (mut reader, stop) = StreamBuffer::new(Box::new(endless), true).unwrap();
        stop.store(true, Ordering::SeqCst);

        let started = Instant::now();
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
