//! Reconnection Backoff
//!
//! Exponential backoff with jitter for the trade stream connection loop.
//! The delay grows by a configurable multiplier per attempt, capped at a
//! maximum, with a random jitter spread to avoid reconnect stampedes.

use std::time::Duration;

use rand::Rng;

use crate::infrastructure::config::WebSocketSettings;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Ceiling for the backoff delay.
    pub max_delay: Duration,
    /// Growth factor applied per attempt.
    pub multiplier: f64,
    /// Jitter spread as a fraction of the delay (0.1 = ±10%).
    pub jitter_factor: f64,
    /// Maximum attempts before giving up (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.1,
            max_attempts: 0, // Unlimited
        }
    }
}

impl ReconnectConfig {
    /// Create configuration from [`WebSocketSettings`].
    #[must_use]
    pub const fn from_websocket_settings(settings: &WebSocketSettings) -> Self {
        Self {
            initial_delay: settings.reconnect_delay_initial,
            max_delay: settings.reconnect_delay_max,
            multiplier: settings.reconnect_delay_multiplier,
            jitter_factor: 0.1,
            max_attempts: settings.max_reconnect_attempts,
        }
    }
}

/// Stateful backoff policy; one instance per connection loop.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectPolicy {
    /// Create a fresh policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Delay to wait before the next attempt, or `None` once the attempt
    /// budget is spent.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts > 0 && self.attempts >= self.config.max_attempts {
            return None;
        }

        // Exponent is bounded so the power never overflows; the cap below
        // dominates long before that.
        let exponent = f64::from(self.attempts.min(30));
        self.attempts += 1;

        let grown = self.config.initial_delay.as_secs_f64() * self.config.multiplier.powf(exponent);
        let capped = grown.min(self.config.max_delay.as_secs_f64());

        Some(apply_jitter(capped, self.config.jitter_factor))
    }

    /// Reset after a successful connection.
    pub const fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts made since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempts
    }
}

fn apply_jitter(seconds: f64, factor: f64) -> Duration {
    if factor <= 0.0 {
        return Duration::from_secs_f64(seconds);
    }

    let spread = seconds * factor;
    let offset: f64 = rand::rng().random_range(-spread..=spread);
    Duration::from_secs_f64((seconds + offset).max(0.001))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_jitter() -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_factor: 0.0,
            max_attempts: 0,
        }
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let mut policy = ReconnectPolicy::new(config_without_jitter());

        assert_eq!(policy.next_delay().unwrap(), Duration::from_millis(100));
        assert_eq!(policy.next_delay().unwrap(), Duration::from_millis(200));
        assert_eq!(policy.next_delay().unwrap(), Duration::from_millis(400));
        assert_eq!(policy.next_delay().unwrap(), Duration::from_millis(800));
    }

    #[test]
    fn delay_caps_at_max() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(2),
            multiplier: 4.0,
            jitter_factor: 0.0,
            max_attempts: 0,
        });

        let _ = policy.next_delay();
        assert_eq!(policy.next_delay().unwrap(), Duration::from_secs(2));
        assert_eq!(policy.next_delay().unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn attempt_budget_is_enforced() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig {
            max_attempts: 3,
            ..config_without_jitter()
        });

        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_some());
        assert_eq!(policy.attempt_count(), 3);
        assert!(policy.next_delay().is_none());
    }

    #[test]
    fn reset_restores_initial_delay() {
        let mut policy = ReconnectPolicy::new(config_without_jitter());
        let _ = policy.next_delay();
        let _ = policy.next_delay();

        policy.reset();
        assert_eq!(policy.attempt_count(), 0);
        assert_eq!(policy.next_delay().unwrap(), Duration::from_millis(100));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        for _ in 0..100 {
            let mut policy = ReconnectPolicy::new(ReconnectConfig {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(10),
                multiplier: 2.0,
                jitter_factor: 0.1,
                max_attempts: 0,
            });

            let millis = policy.next_delay().unwrap().as_millis();
            assert!(millis >= 900, "delay {millis}ms below jitter floor");
            assert!(millis <= 1100, "delay {millis}ms above jitter ceiling");
        }
    }
}
