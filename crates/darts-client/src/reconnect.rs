use std::time::Duration;

use crate::config::ReconnectConfig;

/// Bounded reconnection with a fixed delay between attempts.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    delay: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            attempts: 0,
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }

    /// Consume an attempt. `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.delay)
    }

    /// Restore the full budget after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
