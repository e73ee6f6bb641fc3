//! Injectable time source.
//!
//! Validators, connection policy, and handlers take their clock as an input
//! instead of reading a global, so tests can drive timestamp-skew and
//! duplicate-window cases deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of wall-clock and monotonic time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current wall-clock time in unix milliseconds.
    fn now_unix_ms(&self) -> u64;

    /// Current monotonic instant, used for window arithmetic.
    fn now_instant(&self) -> Instant;
}

/// The process clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    fn now_instant(&self) -> Instant {
        Instant::now()
    }
}

/// A manually-advanced clock for deterministic tests.
///
/// Wall time starts at the provided epoch; the monotonic instant is anchored
/// at construction and advances with [`ManualClock::advance`].
#[derive(Debug, Clone)]
pub struct ManualClock {
    epoch_ms: Arc<AtomicU64>,
    origin: Instant,
}

impl ManualClock {
    /// Creates a clock reporting `epoch_ms` as the current wall time.
    #[must_use]
    pub fn new(epoch_ms: u64) -> Self {
        Self {
            epoch_ms: Arc::new(AtomicU64::new(epoch_ms)),
            origin: Instant::now(),
        }
    }

    /// Advances wall time by `delta`.
    pub fn advance(&self, delta: Duration) {
        let ms = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        self.epoch_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Sets wall time to an absolute unix-millisecond value.
    pub fn set(&self, epoch_ms: u64) {
        self.epoch_ms.store(epoch_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix_ms(&self) -> u64 {
        self.epoch_ms.load(Ordering::SeqCst)
    }

    fn now_instant(&self) -> Instant {
        // Window arithmetic in tests derives instants from wall time so
        // advance() moves both views together.
        self.origin + Duration::from_millis(self.epoch_ms.load(Ordering::SeqCst))
    }
}
