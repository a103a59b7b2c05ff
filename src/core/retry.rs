//! Backoff policy for non-streaming calls.
//!
//! The policy is a pure computation: randomness and sleeping are injected so
//! the delays are deterministic under test and safe to share across calls.

use std::time::Duration;

use async_trait::async_trait;

use crate::core::error::ChatError;

/// Uniform random samples in `[0, 1)`.
///
/// Implementations must be callable concurrently without shared mutable state.
pub trait RandomSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

/// Operating-system randomness via `getrandom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn next_unit(&self) -> f64 {
        let mut bytes = [0_u8; 8];
        if getrandom::fill(&mut bytes).is_err() {
            // Midpoint keeps the delay at its un-jittered value.
            return 0.5;
        }
        let bits = u64::from_le_bytes(bytes) >> 11;
        bits as f64 / (1_u64 << 53) as f64
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction in `[0, 1]` by which a computed delay may shrink or grow.
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter_ratio: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Capped exponential delay for a 1-based attempt index, before jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let scaled = self.base_delay.as_secs_f64() * 2_f64.powi(exponent.min(1024) as i32);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped.max(0.0)).unwrap_or(self.max_delay)
    }

    /// Delay before retrying after `attempt` failed.
    ///
    /// A server `Retry-After` hint is used verbatim; otherwise the backoff delay
    /// is scaled into `[delay * (1 - jitter), delay * (1 + jitter)]`.
    pub fn delay_for(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        random: &dyn RandomSource,
    ) -> Duration {
        if let Some(hint) = retry_after {
            return hint;
        }

        let delay = self.backoff_delay(attempt);
        let jitter = finite_unit(self.jitter_ratio, 0.0);
        if jitter == 0.0 {
            return delay;
        }

        let sample = finite_unit(random.next_unit(), 0.5);
        let factor = 1.0 - jitter + 2.0 * jitter * sample;
        Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(delay)
    }

    /// Whether another attempt should follow the failed `attempt`.
    pub fn should_retry(&self, attempt: u32, error: &ChatError) -> bool {
        attempt < self.max_attempts.max(1) && error.is_retryable()
    }
}

/// `value` clamped into `[0, 1]`, or `fallback` when it is NaN or infinite.
pub(crate) fn finite_unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}
