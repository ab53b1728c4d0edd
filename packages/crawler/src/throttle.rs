//! Adaptive politeness delay.
//!
//! The delay between requests tracks observed latency: slow responses
//! widen it, fast ones narrow it, always clamped to the retailer's
//! configured window. Each wait carries ±20% jitter so crawls do not
//! beat a fixed rhythm against the host.

use std::time::Duration;

/// Latency-fed delay, bounded to `[floor, ceiling]`.
#[derive(Debug, Clone)]
pub struct AdaptiveThrottle {
    current: Duration,
    floor: Duration,
    ceiling: Duration,
}

impl AdaptiveThrottle {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            current: floor,
            floor,
            ceiling,
        }
    }

    /// Feed one observed response latency. The new delay is the midpoint
    /// of the previous delay and the latency, clamped.
    pub fn record(&mut self, latency: Duration) {
        let blended = (self.current + latency) / 2;
        self.current = blended.clamp(self.floor, self.ceiling);
    }

    /// Current delay without jitter.
    pub fn base_delay(&self) -> Duration {
        self.current
    }

    /// Delay for the next wait, jittered ±20%.
    pub fn next_delay(&self) -> Duration {
        let factor = 0.8 + 0.4 * fastrand::f64();
        self.current.mul_f64(factor)
    }

    /// Raise the floor (e.g. robots.txt crawl-delay asks for more than
    /// the config default). Never lowers it.
    pub fn raise_floor(&mut self, floor: Duration) {
        if floor > self.floor {
            self.floor = floor;
            if self.current < floor {
                self.current = floor;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_responses_widen_the_delay() {
        let mut throttle =
            AdaptiveThrottle::new(Duration::from_millis(500), Duration::from_secs(15));
        for _ in 0..5 {
            throttle.record(Duration::from_secs(8));
        }
        assert!(throttle.base_delay() > Duration::from_secs(4));
        assert!(throttle.base_delay() <= Duration::from_secs(15));
    }

    #[test]
    fn fast_responses_narrow_back_to_the_floor() {
        let mut throttle =
            AdaptiveThrottle::new(Duration::from_millis(500), Duration::from_secs(15));
        throttle.record(Duration::from_secs(10));
        for _ in 0..10 {
            throttle.record(Duration::from_millis(50));
        }
        assert_eq!(throttle.base_delay(), Duration::from_millis(500));
    }

    #[test]
    fn jitter_stays_within_twenty_percent() {
        let throttle =
            AdaptiveThrottle::new(Duration::from_millis(1000), Duration::from_secs(15));
        for _ in 0..100 {
            let d = throttle.next_delay();
            assert!(d >= Duration::from_millis(800), "too short: {d:?}");
            assert!(d <= Duration::from_millis(1200), "too long: {d:?}");
        }
    }

    #[test]
    fn crawl_delay_only_raises_the_floor() {
        let mut throttle =
            AdaptiveThrottle::new(Duration::from_secs(1), Duration::from_secs(15));
        throttle.raise_floor(Duration::from_secs(3));
        assert_eq!(throttle.base_delay(), Duration::from_secs(3));

        throttle.raise_floor(Duration::from_millis(100));
        assert_eq!(throttle.base_delay(), Duration::from_secs(3));
    }
}
