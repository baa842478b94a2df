use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of wall-clock time.
///
/// Pacing, fatigue, and cooldown decay all read elapsed real time, so the
/// clock is injected rather than read ambiently: tests and fast-forward
/// runs substitute a manually advanced clock.
pub trait Clock {
    fn now(&self) -> SystemTime;
}

/// Production clock backed by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually advanced clock. Clones share the same underlying offset, so a
/// test can hold one handle while the simulator owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: SystemTime,
    offset_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: UNIX_EPOCH,
            offset_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, step: Duration) {
        self.offset_ms
            .fetch_add(step.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        self.origin + self.elapsed()
    }
}

/// Milliseconds from `start` to `end`, zero if `end` precedes `start`.
pub fn millis_between(start: SystemTime, end: SystemTime) -> f64 {
    end.duration_since(start)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_origin() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), UNIX_EPOCH);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(50));
        clock.advance(Duration::from_millis(150));
        assert_eq!(clock.elapsed(), Duration::from_millis(200));
        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_millis(200));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(Duration::from_secs(2));
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_millis_between() {
        let start = UNIX_EPOCH;
        let end = start + Duration::from_millis(1234);
        assert_eq!(millis_between(start, end), 1234.0);
    }

    #[test]
    fn test_millis_between_backwards_is_zero() {
        let start = UNIX_EPOCH + Duration::from_secs(5);
        assert_eq!(millis_between(start, UNIX_EPOCH), 0.0);
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
