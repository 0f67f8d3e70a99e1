//! Backoff Calculator — pure delay computation for the retry loop.
//!
//! `delay = clamp(base * 2^attempt, cap) ± jitter`, floored so a delay is
//! never zero. Jitter is a fixed fraction of the capped delay drawn uniformly
//! from [-1, 1], so concurrent callers do not retry in lockstep.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with jitter.
///
/// Defaults: 1s doubling per attempt, capped at 30s, ±10% jitter, floored at
/// 100ms.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Delay for attempt 0, before jitter.
    pub base: Duration,
    /// Upper bound applied before jitter.
    pub cap: Duration,
    /// Half-width of the jitter band, as a fraction of the capped delay.
    pub jitter_fraction: f64,
    /// Lower bound applied after jitter.
    pub floor: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            jitter_fraction: 0.1,
            floor: Duration::from_millis(100),
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait after `attempt` (0-based) before the next try.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with_rng(attempt, &mut rand::thread_rng())
    }

    /// Same as [`delay`](Self::delay) with an injected RNG, so tests can
    /// pin the jitter with a seeded generator.
    pub fn delay_with_rng<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exponential = self.base.as_secs_f64() * 2f64.powi(attempt.min(64) as i32);
        let capped = exponential.min(self.cap.as_secs_f64());
        let jitter = capped * self.jitter_fraction * rng.gen_range(-1.0..=1.0);
        let secs = (capped + jitter).max(self.floor.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}
