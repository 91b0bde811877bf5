//! Strictly increasing timestamps

use log::warn;

/// Clamps timestamps to `max(last + 1, now)` so a stream never repeats or goes backwards
#[derive(Debug, Clone, Default)]
pub struct MonotonicClock {
    last: Option<f64>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp for an event observed at `now` (milliseconds)
    pub fn next(&mut self, now: f64) -> f64 {
        let next = match self.last {
            Some(last) => {
                if now <= last {
                    warn!("timestamp {} not after {}, clamping", now, last);
                }
                now.max(last + 1.0)
            }
            None => now,
        };
        self.last = Some(next);
        next
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_repeats_and_regressions() {
        let mut clock = MonotonicClock::new();
        assert_eq!(clock.next(100.0), 100.0);
        assert_eq!(clock.next(100.0), 101.0);
        assert_eq!(clock.next(50.0), 102.0);
        assert_eq!(clock.next(200.0), 200.0);
        // Less than a millisecond later still advances by a full step
        assert_eq!(clock.next(200.5), 201.0);
        assert_eq!(clock.next(203.25), 203.25);
        clock.reset();
        assert_eq!(clock.next(10.0), 10.0);
    }
}
