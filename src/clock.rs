//! Wall-clock source in epoch seconds, injectable so aggregation can be
//! driven at fixed instants.

use chrono::Utc;
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch, with sub-second precision
    fn now_epoch_seconds(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(now: f64) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: f64) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, seconds: f64) {
        *self.now.lock() += seconds;
    }
}

impl Clock for ManualClock {
    fn now_epoch_seconds(&self) -> f64 {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_recent() {
        let now = SystemClock.now_epoch_seconds();
        // 2020-01-01T00:00:00Z
        assert!(now > 1_577_836_800.0);
    }

    #[test]
    fn test_manual_clock_moves_on_request() {
        let clock = ManualClock::new(1_000.0);
        assert_eq!(clock.now_epoch_seconds(), 1_000.0);

        clock.advance(600.0);
        assert_eq!(clock.now_epoch_seconds(), 1_600.0);

        clock.set(5.0);
        assert_eq!(clock.now_epoch_seconds(), 5.0);
    }
}
