//! Time source seam. Clocks are monotonic only within a single process -
//! persisted timestamps (`next_retry_at`, directory mtimes) are wall-clock,
//! so production always uses [`SystemClock`]. Tests inject [`FixedClock`] to
//! make retry/offpeak/retention windows deterministic.

use std::time::SystemTime;

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock pinned to a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SystemTime);

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Seconds since the UNIX epoch, as used in `target.json`'s `next_retry_at`.
pub fn epoch_seconds(time: SystemTime) -> f64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_returns_pinned_instant() {
        let t = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000);
        let clock = FixedClock(t);
        assert_eq!(clock.now(), t);
        assert_eq!(epoch_seconds(clock.now()), 1_000.0);
    }
}
