//! Exponential backoff with a cancellable sleep
//!
//! Shared by the remote track queue and the live stream reconnect loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::queue::{MAX_BACKOFF_SECS, RETRY_BASE_DELAY_SECS};

/// Granularity at which a sleeping retry checks its stop flag
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Exponential backoff policy: `min(2^(n-1) * base, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(RETRY_BASE_DELAY_SECS),
            max: Duration::from_secs(MAX_BACKOFF_SECS),
        }
    }
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retry number `consecutive_failures` (1-based).
    /// e.g., with base=2s, max=30s: 2s, 4s, 8s, 16s, 30s, 30s, ...
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        let exp = consecutive_failures.saturating_sub(1).min(16);
        let delay = self.base.saturating_mul(1u32 << exp);
        delay.min(self.max)
    }

    /// Sleep for `delay(consecutive_failures)`, checking `stop_flag` every 250ms.
    /// Returns true if the full duration elapsed, false if stopped early.
    pub fn sleep(&self, consecutive_failures: u32, stop_flag: &Arc<AtomicBool>) -> bool {
        let total = self.delay(consecutive_failures);
        let start = Instant::now();
        while start.elapsed() < total {
            if stop_flag.load(Ordering::Relaxed) {
                return false;
            }
            let remaining = total.saturating_sub(start.elapsed());
            std::thread::sleep(remaining.min(STOP_CHECK_INTERVAL));
        }
        !stop_flag.load(Ordering::Relaxed)
    }
}

/// Sleep with the default policy. Used by the stream reconnect loops.
pub(crate) fn backoff_sleep(consecutive_failures: u32, stop_flag: &Arc<AtomicBool>) -> bool {
    Backoff::default().sleep(consecutive_failures, stop_flag)
}
