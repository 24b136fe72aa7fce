//! Retry decisions for classified failures.
//!
//! Only [`ErrorKind::Network`] failures are retried. Delays grow
//! exponentially from the initial delay, are capped, and are spread with a
//! symmetric random jitter so concurrent callers do not retry in lockstep.
//!
//! # Example
//!
//! ```rust
//! use shop_api_client::clients::{ClassifiedError, ErrorKind, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! let error = ClassifiedError::new(ErrorKind::Network, "reset", "GetCart");
//!
//! assert!(policy.should_retry(&error, 0).retry);
//! assert!(!policy.should_retry(&error, 2).retry);
//! ```

use std::time::Duration;

use rand::Rng;

use crate::clients::errors::{ClassifiedError, ErrorKind};
use crate::error::ConfigError;

/// Default total number of attempts (initial call plus retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(300);

/// Default upper bound of the un-jittered delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(3000);

/// Default jitter ratio (±20%).
pub const DEFAULT_JITTER: f64 = 0.2;

/// Outcome of [`RetryPolicy::should_retry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryDecision {
    /// Whether the pipeline should make another attempt.
    pub retry: bool,
    /// How long to wait before that attempt. Zero when not retrying.
    pub delay: Duration,
    /// Whether stored credentials must be cleared before returning.
    pub invalidate_credentials: bool,
}

impl RetryDecision {
    const fn stop(invalidate_credentials: bool) -> Self {
        Self {
            retry: false,
            delay: Duration::ZERO,
            invalidate_credentials,
        }
    }
}

/// Per-call retry bookkeeping.
///
/// Created at attempt 0 for one `execute` call and dropped when the call
/// finishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryState {
    /// Zero-based index of the current attempt.
    pub attempt: u32,
    /// Name of the operation being executed.
    pub operation_id: String,
    /// Delay chosen before the current attempt.
    pub next_delay: Duration,
}

impl RetryState {
    /// Creates the state for the first attempt.
    #[must_use]
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            attempt: 0,
            operation_id: operation_id.into(),
            next_delay: Duration::ZERO,
        }
    }

    /// Moves to the next attempt after waiting `delay`.
    pub fn advance(&mut self, delay: Duration) {
        self.attempt += 1;
        self.next_delay = delay;
    }
}

/// Exponential backoff with jitter, limited to network failures.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Returns the total number of attempts allowed.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay before the first retry.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Returns the cap applied before jitter.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Returns the jitter ratio.
    #[must_use]
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Decides what to do after `error` ended attempt number `attempt`
    /// (zero-based).
    #[must_use]
    pub fn should_retry(&self, error: &ClassifiedError, attempt: u32) -> RetryDecision {
        self.should_retry_with_rng(error, attempt, &mut rand::thread_rng())
    }

    /// Same as [`should_retry`](Self::should_retry) with a caller-supplied RNG.
    pub fn should_retry_with_rng<R: Rng>(
        &self,
        error: &ClassifiedError,
        attempt: u32,
        rng: &mut R,
    ) -> RetryDecision {
        match error.kind {
            ErrorKind::AuthExpired => RetryDecision::stop(true),
            ErrorKind::Network if error.retryable && attempt.saturating_add(1) < self.max_attempts => {
                RetryDecision {
                    retry: true,
                    delay: self.jittered(self.base_delay(attempt), rng),
                    invalidate_credentials: false,
                }
            }
            _ => RetryDecision::stop(false),
        }
    }

    /// Returns the un-jittered delay after attempt `attempt`:
    /// `min(initial * 2^attempt, max)`.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    fn jittered<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let factor = rng.gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        delay.mul_f64(factor)
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    jitter: Option<f64>,
}

impl RetryPolicyBuilder {
    /// Sets the total number of attempts (at least 1).
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Sets the cap applied before jitter.
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Sets the jitter ratio, in `[0, 1)`.
    #[must_use]
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Builds the policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRetryPolicy`] for zero attempts, a
    /// jitter outside `[0, 1)`, or an initial delay above the cap.
    pub fn build(self) -> Result<RetryPolicy, ConfigError> {
        let defaults = RetryPolicy::default();
        let policy = RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            initial_delay: self.initial_delay.unwrap_or(defaults.initial_delay),
            max_delay: self.max_delay.unwrap_or(defaults.max_delay),
            jitter: self.jitter.unwrap_or(defaults.jitter),
        };

        if policy.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy {
                reason: "max_attempts must be at least 1".to_string(),
            });
        }
        if !(0.0..1.0).contains(&policy.jitter) {
            return Err(ConfigError::InvalidRetryPolicy {
                reason: format!("jitter must be in [0, 1), got {}", policy.jitter),
            });
        }
        if policy.initial_delay > policy.max_delay {
            return Err(ConfigError::InvalidRetryPolicy {
                reason: "initial_delay must not exceed max_delay".to_string(),
            });
        }
        Ok(policy)
    }
}
