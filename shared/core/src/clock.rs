use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Source of "now" for every time-dependent decision, in unix seconds.
pub trait Clock: Send + Sync {
    fn unix_timestamp(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn unix_timestamp(&self) -> u64 {
        (**self).unix_timestamp()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_timestamp(&self) -> u64 {
        // a clock before 1970 is treated as the epoch
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(unix_timestamp: u64) -> Self {
        Self {
            now: AtomicU64::new(unix_timestamp),
        }
    }

    pub fn set(&self, unix_timestamp: u64) {
        self.now.store(unix_timestamp, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: u64) {
        self.advance(days * SECONDS_PER_DAY);
    }
}

impl Clock for ManualClock {
    fn unix_timestamp(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Wraps another clock and shifts it forward by a settable amount, so a live
/// deployment can be pushed past its windows without waiting for them.
#[derive(Debug, Default)]
pub struct OffsetClock<C> {
    inner: C,
    extra: AtomicU64,
}

impl<C: Clock> OffsetClock<C> {
    pub fn new(inner: C, extra_seconds: u64) -> Self {
        Self {
            inner,
            extra: AtomicU64::new(extra_seconds),
        }
    }

    pub fn set_extra(&self, extra_seconds: u64) {
        self.extra.store(extra_seconds, Ordering::SeqCst);
    }

    pub fn extra(&self) -> u64 {
        self.extra.load(Ordering::SeqCst)
    }
}

impl<C: Clock> Clock for OffsetClock<C> {
    fn unix_timestamp(&self) -> u64 {
        self.inner.unix_timestamp().saturating_add(self.extra())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(100);
        clock.advance(5);
        assert_eq!(clock.unix_timestamp(), 105);
        clock.advance_days(1);
        assert_eq!(clock.unix_timestamp(), 105 + SECONDS_PER_DAY);
        clock.set(7);
        assert_eq!(clock.unix_timestamp(), 7);
    }

    #[test]
    fn test_offset_clock_adds_extra() {
        let clock = OffsetClock::new(ManualClock::new(1_000), 0);
        assert_eq!(clock.unix_timestamp(), 1_000);
        clock.set_extra(4 * SECONDS_PER_DAY);
        assert_eq!(clock.unix_timestamp(), 1_000 + 4 * SECONDS_PER_DAY);
        // setting replaces, it does not accumulate
        clock.set_extra(10);
        assert_eq!(clock.unix_timestamp(), 1_010);
    }
}
