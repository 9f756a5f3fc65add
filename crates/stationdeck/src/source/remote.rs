//! Remote catalog-driven track queue
//!
//! Resolves a queue session, drains its batch one track at a time and
//! re-resolves once the batch runs out. Collaborator errors never escape:
//! every failure is followed by a backoff sleep and another attempt.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backoff::Backoff;
use crate::catalog::CatalogClient;
use crate::error::{DeckError, Result};
use crate::track::Track;

use super::TrackSource;

/// Artist or song radio backed by the remote catalog
pub struct RemoteQueueSource {
    catalog: Arc<dyn CatalogClient>,
    user_id: String,
    source_id: String,
    pending: VecDeque<Track>,
    backoff: Backoff,
}

impl RemoteQueueSource {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        user_id: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            user_id: user_id.into(),
            source_id: source_id.into(),
            pending: VecDeque::new(),
            backoff: Backoff::default(),
        }
    }

    /// Builder: override the retry policy
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Resolve a fresh session and fetch its batch. Sessions expire
    /// server-side, so one is never reused across batches.
    fn refill(&mut self) -> Result<()> {
        let session = self
            .catalog
            .resolve_queue_session(&self.user_id, &self.source_id)?;
        let batch = self.catalog.fetch_batch(&session)?;
        if batch.is_empty() {
            return Err(DeckError::Remote(format!(
                "empty batch for session {}",
                session.id
            )));
        }
        debug!(source = self.source_id.as_str(), tracks = batch.len(), "queue refilled");
        self.pending.extend(batch);
        Ok(())
    }
}

impl TrackSource for RemoteQueueSource {
    fn next_track(&mut self, stop: &Arc<AtomicBool>) -> Result<Track> {
        let mut failures = 0u32;
        loop {
            if stop.load(Ordering::SeqCst) {
                return Err(DeckError::Cancelled);
            }
            if let Some(track) = self.pending.pop_front() {
                return Ok(track);
            }
            match self.refill() {
                Ok(()) => failures = 0,
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = self.backoff.delay(failures);
                    warn!(
                        source = self.source_id.as_str(),
                        attempt = failures,
                        "queue fetch failed: {}, retrying in {:?}",
                        e,
                        delay
                    );
                    if !self.backoff.sleep(failures, stop) {
                        return Err(DeckError::Cancelled);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_backoff, MockCatalog};
    use std::thread;
    use std::time::{Duration, Instant};

    fn source(catalog: Arc<MockCatalog>) -> RemoteQueueSource {
        RemoteQueueSource::new(catalog, "user", "artist-1").with_backoff(fast_backoff())
    }

    #[test]
    fn yields_batch_in_order_then_refills() {
        let catalog = Arc::new(MockCatalog::new(2));
        let mut src = source(catalog.clone());
        let stop = Arc::new(AtomicBool::new(false));
        let ids: Vec<String> = (0..5).map(|_| src.next_track(&stop).unwrap().id).collect();
        assert_eq!(ids, vec!["r0", "r1", "r2", "r3", "r4"]);
        assert_eq!(catalog.batch_calls.load(Ordering::SeqCst), 3);
        // A fresh session per batch
        assert_eq!(catalog.session_calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn transient_failures_are_absorbed() {
        let catalog = Arc::new(MockCatalog::new(1).fail_times(4));
        let mut src = source(catalog);
        let stop = Arc::new(AtomicBool::new(false));
        let track = src.next_track(&stop).unwrap();
        assert_eq!(track.id, "r0");
    }

    #[test]
    fn empty_batches_are_retried() {
        let catalog = Arc::new(MockCatalog::new(0));
        let mut src = source(catalog.clone());
        let stop = Arc::new(AtomicBool::new(false));

        let stopper = stop.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stopper.store(true, Ordering::SeqCst);
        });
        assert!(matches!(src.next_track(&stop), Err(DeckError::Cancelled)));
        assert!(catalog.batch_calls.load(Ordering::SeqCst) > 1);
        t.join().unwrap();
    }

    #[test]
    fn stop_cancels_long_backoff() {
        let catalog = Arc::new(MockCatalog::new(1).fail_times(100));
        let mut src = RemoteQueueSource::new(catalog, "user", "artist-1");
        let stop = Arc::new(AtomicBool::new(false));

        let stopper = stop.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            stopper.store(true, Ordering::SeqCst);
        });
        let started = Instant::now();
        assert!(matches!(src.next_track(&stop), Err(DeckError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(1));
        t.join().unwrap();
    }

    #[test]
    fn already_stopped_returns_cancelled() {
        let catalog = Arc::new(MockCatalog::new(1));
        let mut src = source(catalog.clone());
        let stop = Arc::new(AtomicBool::new(true));
        assert!(matches!(src.next_track(&stop), Err(DeckError::Cancelled)));
        assert_eq!(catalog.batch_calls.load(Ordering::SeqCst), 0);
    }
}
