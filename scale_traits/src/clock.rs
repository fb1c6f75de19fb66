use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction used for every timer in the core.
///
/// All phase timers (settle window, weighing timeout, abandoned-session
/// timeout) are expressed as milliseconds since an epoch `Instant` and
/// compared against configured durations; nothing busy-waits past its
/// bound.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        self.now().saturating_duration_since(epoch).as_millis() as u64
    }
}

/// Real monotonic clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock for tests and simulation: `now()` is
/// `origin + offset`, and `sleep` advances the offset instead of
/// blocking. Clones share the same offset.
#[derive(Debug, Clone)]
pub struct TestClock {
    origin: Instant,
    offset: std::sync::Arc<std::sync::Mutex<Duration>>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: std::sync::Arc::new(std::sync::Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
        self.origin + off
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_without_sleeping() {
        let c = TestClock::new();
        let epoch = c.now();
        c.sleep(Duration::from_millis(250));
        assert_eq!(c.ms_since(epoch), 250);
        c.advance(Duration::from_millis(50));
        assert_eq!(c.ms_since(epoch), 300);
    }

    #[test]
    fn ms_since_saturates_before_epoch() {
        let c = MonotonicClock::new();
        let future = c.now() + Duration::from_secs(60);
        assert_eq!(c.ms_since(future), 0);
    }
}
