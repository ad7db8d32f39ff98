//! Exponential backoff for verifier retries.
//!
//! `delay(n) = min(max_delay, base_delay * multiplier^(n-1))` for attempt
//! `n ≥ 1`. The policy is pure; randomness lives in a [`JitterSource`] so
//! tests can pin it with [`NoJitter`].

use std::fmt::Debug;
use std::time::Duration;

use rand::Rng;

/// Retry budget and delay curve.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Attempts allowed before a transiently failing record is marked failed.
    pub max_attempts: u32,
    /// Delay after the first attempt.
    pub base_delay: Duration,
    /// Growth factor per attempt. Values below 1.0 are treated as 1.0.
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            max_delay: Duration::from_millis(60_000),
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait after attempt number `attempts` (1-based). Attempt 0 is
    /// treated as 1.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.max(1) - 1;
        let multiplier = if self.multiplier.is_finite() {
            self.multiplier.max(1.0)
        } else {
            1.0
        };
        let max_ms = self.max_delay.as_millis() as f64;
        let raw_ms = self.base_delay.as_millis() as f64 * multiplier.powi(exponent.min(i32::MAX as u32) as i32);
        let capped = if raw_ms.is_finite() { raw_ms.min(max_ms) } else { max_ms };
        Duration::from_millis(capped as u64)
    }

    /// Whether `attempts` dispatched attempts use up the budget.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

/// Perturbs a computed delay.
pub trait JitterSource: Send + Sync + Debug {
    /// Return the delay to actually use.
    fn apply(&self, delay: Duration) -> Duration;
}

/// Leaves delays unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn apply(&self, delay: Duration) -> Duration {
        delay
    }
}

/// Scales each delay by a uniform factor in `[1 - ratio, 1 + ratio]`.
#[derive(Debug, Clone, Copy)]
pub struct RatioJitter {
    ratio: f64,
}

impl RatioJitter {
    /// `ratio` is clamped to `[0, 1]`.
    pub fn new(ratio: f64) -> Self {
        let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
        Self { ratio }
    }

    /// The effective ratio.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl JitterSource for RatioJitter {
    fn apply(&self, delay: Duration) -> Duration {
        if self.ratio == 0.0 {
            return delay;
        }
        let factor = rand::thread_rng().gen_range((1.0 - self.ratio)..=(1.0 + self.ratio));
        Duration::from_secs_f64(delay.as_secs_f64() * factor)
    }
}
