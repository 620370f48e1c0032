//! Retry and pacing parameters for one remote source.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded-retry policy.
///
/// `max_attempts` counts every call, including the first. The wait after the
/// n-th rate-limited attempt is `backoff_secs * backoff_multiplier^(n-1)`,
/// capped at `max_backoff_secs`. `inter_call_delay_secs` is the pause between
/// independent calls of a loop (pages, coins, tickers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_secs: f64,
    pub backoff_multiplier: f64,
    pub max_backoff_secs: f64,
    pub inter_call_delay_secs: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::coingecko()
    }
}

impl RetryPolicy {
    /// CoinGecko's public tier: 3 attempts, 60s backoff, 15s between calls.
    pub fn coingecko() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 60.0,
            backoff_multiplier: 1.5,
            max_backoff_secs: 300.0,
            inter_call_delay_secs: 15.0,
        }
    }

    /// Yahoo Finance: 4 attempts, 45s backoff, 3s between tickers.
    pub fn yahoo() -> Self {
        Self {
            max_attempts: 4,
            backoff_secs: 45.0,
            backoff_multiplier: 1.5,
            max_backoff_secs: 300.0,
            inter_call_delay_secs: 3.0,
        }
    }

    /// Single static file download: no pacing needed.
    pub fn single_file() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 30.0,
            backoff_multiplier: 2.0,
            max_backoff_secs: 300.0,
            inter_call_delay_secs: 0.0,
        }
    }

    /// No waiting at all. Useful for replay and tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_secs: 0.0,
            backoff_multiplier: 1.0,
            max_backoff_secs: 0.0,
            inter_call_delay_secs: 0.0,
        }
    }

    /// Wait after the given 1-based rate-limited attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.backoff_secs * self.backoff_multiplier.powi(exponent);
        self.cap(secs_to_duration(secs))
    }

    /// Clamp a wait to `max_backoff_secs` (no cap when that is zero).
    pub fn cap(&self, wait: Duration) -> Duration {
        if self.max_backoff_secs > 0.0 {
            wait.min(secs_to_duration(self.max_backoff_secs))
        } else {
            wait
        }
    }

    pub fn inter_call_delay(&self) -> Duration {
        secs_to_duration(self.inter_call_delay_secs)
    }

    /// Check the policy is usable. Returns a human-readable reason otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".into());
        }
        for (name, value) in [
            ("backoff_secs", self.backoff_secs),
            ("max_backoff_secs", self.max_backoff_secs),
            ("inter_call_delay_secs", self.inter_call_delay_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        Ok(())
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
