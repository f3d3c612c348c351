//! Clock abstraction for record timestamps and time-travel reads.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the current time in Unix seconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> u64;

    /// Current time truncated to the `u32` stored on index records.
    fn now_u32(&self) -> u32 {
        u32::try_from(self.now()).unwrap_or(u32::MAX)
    }
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    time: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(initial: u64) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.time.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, time: u64) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> u64 {
        self.time.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_source() {
        assert!(SystemTimeSource.now() > 1_600_000_000);
    }

    #[test]
    fn test_manual_time_source() {
        let clock = ManualTimeSource::new(100);
        clock.advance(5);
        assert_eq!(clock.now(), 105);
        clock.set(u64::MAX);
        assert_eq!(clock.now_u32(), u32::MAX);
    }
}
