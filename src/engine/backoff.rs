//! Idle backoff
//!
//! Each consecutive idle cycle doubles the sleep, starting from the floor and
//! capped at the maximum: after N idle cycles the sleep is
//! `min(sleep_min * 2^N, sleep_max)`. Any row resets it.

use std::time::Duration;

/// Sleep policy between idle cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleBackoff {
    min: Duration,
    max: Duration,
    idle_cycles: u32,
    current: Duration,
}

impl IdleBackoff {
    /// Create a backoff between `min` and `max`
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self {
            min,
            max,
            idle_cycles: 0,
            current: min,
        }
    }

    /// Register an idle cycle and return how long to sleep
    pub fn next_idle(&mut self) -> Duration {
        self.idle_cycles = self.idle_cycles.saturating_add(1);
        self.current = self.delay_for(self.idle_cycles);
        self.current
    }

    /// Back to the floor after activity
    pub fn reset(&mut self) {
        self.idle_cycles = 0;
        self.current = self.min;
    }

    /// Sleep after `idle_cycles` consecutive idle cycles
    pub fn delay_for(&self, idle_cycles: u32) -> Duration {
        let factor = 2u32.saturating_pow(idle_cycles);
        self.min
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Most recent sleep duration (the floor after a reset)
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Consecutive idle cycles so far
    pub fn idle_cycles(&self) -> u32 {
        self.idle_cycles
    }

    /// Sleep floor
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Sleep cap
    pub fn max(&self) -> Duration {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, 20; "first idle cycle doubles")]
    #[test_case(2, 40; "second idle cycle")]
    #[test_case(5, 320; "fifth idle cycle")]
    #[test_case(9, 5000; "capped at max")]
    #[test_case(64, 5000; "huge exponent saturates")]
    fn test_delay_for(idle_cycles: u32, expected_ms: u64) {
        let backoff = IdleBackoff::new(Duration::from_millis(10), Duration::from_millis(5000));
        assert_eq!(
            backoff.delay_for(idle_cycles),
            Duration::from_millis(expected_ms)
        );
    }

    #[test]
    fn test_next_idle_and_reset() {
        let mut backoff = IdleBackoff::new(Duration::from_millis(10), Duration::from_millis(50));
        assert_eq!(backoff.current(), Duration::from_millis(10));

        assert_eq!(backoff.next_idle(), Duration::from_millis(20));
        assert_eq!(backoff.next_idle(), Duration::from_millis(40));
        assert_eq!(backoff.next_idle(), Duration::from_millis(50));
        assert_eq!(backoff.next_idle(), Duration::from_millis(50));
        assert_eq!(backoff.idle_cycles(), 4);

        backoff.reset();
        assert_eq!(backoff.idle_cycles(), 0);
        assert_eq!(backoff.current(), Duration::from_millis(10));
        assert_eq!(backoff.next_idle(), Duration::from_millis(20));
    }

    #[test]
    fn test_max_below_min_is_raised() {
        let backoff = IdleBackoff::new(Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(backoff.max(), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(2));
    }
}
