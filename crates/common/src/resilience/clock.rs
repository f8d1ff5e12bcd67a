//! Injectable time
//!
//! The token bucket reads [`Clock::now`] to measure refill intervals and the
//! request signer reads [`Clock::system_time`] for its timestamp. Tests swap
//! in a [`MockClock`] and move time by hand.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync + 'static {
    /// Monotonic time
    fn now(&self) -> Instant;

    /// Wall-clock time
    fn system_time(&self) -> SystemTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        T::now(self)
    }

    fn system_time(&self) -> SystemTime {
        T::system_time(self)
    }
}

/// Clock that only moves when told to
///
/// Both readings are derived from one offset: `now()` is the creation
/// instant plus the offset, `system_time()` is the UNIX epoch plus the
/// offset. Clones share the offset.
#[derive(Debug, Clone)]
pub struct MockClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::at_epoch_offset(Duration::ZERO)
    }

    /// A clock whose wall time reads `since_epoch` after 1970-01-01T00:00:00Z
    pub fn at_epoch_offset(since_epoch: Duration) -> Self {
        Self { origin: Instant::now(), offset: Arc::new(Mutex::new(since_epoch)) }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }

    fn offset(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.origin + self.offset()
    }

    fn system_time(&self) -> SystemTime {
        UNIX_EPOCH + self.offset()
    }
}
