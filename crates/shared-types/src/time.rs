//! Time source abstraction, so expiry and `last_update` are testable.

use crate::entities::Timestamp;

/// Time source for consistent timestamp handling.
pub trait TimeSource: Send + Sync {
    /// Returns the current Unix time in seconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            // Clock before Unix epoch - return 0 rather than panic
            .unwrap_or(0)
    }
}

/// Manually driven time source for tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct MockTimeSource {
    time: std::sync::atomic::AtomicU64,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: std::sync::atomic::AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.time
            .fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(std::sync::atomic::Ordering::SeqCst)
    }
}
