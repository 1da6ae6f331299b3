//! Adaptive timer period
//!
//! A period that is nudged up or down at runtime and always stays within
//! `[min, max]`. Arming the OS timer with the result is left to the caller.

use std::time::Duration;

use fm_error::{FanmgrError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptivePeriod {
    initial: Duration,
    current: Duration,
    min: Duration,
    max: Duration,
}

impl AdaptivePeriod {
    /// `initial` is clamped into `[min, max]`
    pub fn new(initial: Duration, min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(FanmgrError::config(format!(
                "timer period bounds inverted: min {:?} > max {:?}",
                min, max
            )));
        }
        let initial = initial.clamp(min, max);
        Ok(Self {
            initial,
            current: initial,
            min,
            max,
        })
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn set(&mut self, period: Duration) -> Duration {
        self.current = period.clamp(self.min, self.max);
        self.current
    }

    pub fn increase(&mut self, delta: Duration) -> Duration {
        self.set(self.current.saturating_add(delta))
    }

    pub fn decrease(&mut self, delta: Duration) -> Duration {
        self.set(self.current.saturating_sub(delta))
    }

    pub fn reset(&mut self) -> Duration {
        self.current = self.initial;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_increase_saturates_at_max() {
        let mut period = AdaptivePeriod::new(ms(100), ms(50), ms(250)).unwrap();
        assert_eq!(period.increase(ms(100)), ms(200));
        assert_eq!(period.increase(ms(100)), ms(250));
        assert_eq!(period.current(), ms(250));
    }

    #[test]
    fn test_decrease_saturates_at_min() {
        let mut period = AdaptivePeriod::new(ms(100), ms(50), ms(250)).unwrap();
        assert_eq!(period.decrease(ms(40)), ms(60));
        assert_eq!(period.decrease(ms(40)), ms(50));
        // larger than the current value must not underflow
        assert_eq!(period.decrease(ms(1000)), ms(50));
    }

    #[test]
    fn test_set_and_reset() {
        let mut period = AdaptivePeriod::new(ms(500), ms(50), ms(250)).unwrap();
        assert_eq!(period.current(), ms(250));
        assert_eq!(period.set(ms(10)), ms(50));
        assert_eq!(period.reset(), ms(250));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        assert!(AdaptivePeriod::new(ms(100), ms(300), ms(200)).is_err());
    }
}
