//! Retry/backoff engine

use crate::classify::ErrorClass;
use std::time::Duration;

/// Backoff curve between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `base * attempt`
    Linear,
    /// `base * multiplier^(attempt - 1)`
    Exponential { multiplier: f64 },
}

/// Retry configuration for gateway requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of calls for one logical request, first call included
    pub max_attempts: u32,

    /// Delay unit the curve is built from
    pub base_delay: Duration,

    /// Ceiling for a single delay
    pub max_delay: Duration,

    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Exponential { multiplier: 2.0 },
        }
    }
}

/// Retry decision for one failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub delay: Duration,
}

impl RetryDecision {
    pub fn stop() -> Self {
        Self {
            retry: false,
            delay: Duration::ZERO,
        }
    }

    pub fn after(delay: Duration) -> Self {
        Self { retry: true, delay }
    }
}

/// Per-request attempt bookkeeping; owned by a single `send` call.
#[derive(Debug, Clone)]
pub struct AttemptState {
    attempt: u32,
    max_attempts: u32,
    base_delay: Duration,
    last_error_code: Option<String>,
}

impl AttemptState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 1,
            max_attempts: policy.max_attempts.max(1),
            base_delay: policy.base_delay,
            last_error_code: None,
        }
    }

    /// 1-based number of the attempt currently in flight
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn last_error_code(&self) -> Option<&str> {
        self.last_error_code.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    pub(crate) fn record_failure(&mut self, code: Option<&str>) {
        self.last_error_code = code.map(str::to_string);
    }

    pub(crate) fn advance(&mut self) {
        self.attempt = self.attempt.saturating_add(1);
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before the attempt following `attempt` (1-based).
    ///
    /// Non-decreasing in `attempt` and never above `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let base = self.base_delay.as_secs_f64();
        let secs = match self.backoff {
            Backoff::Linear => base * f64::from(attempt),
            Backoff::Exponential { multiplier } => {
                let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
                base * multiplier.max(1.0).powi(exponent)
            }
        };
        let ceiling = self.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= ceiling {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Decide whether the failed attempt in `state` should be retried.
    pub fn should_retry(&self, class: ErrorClass, state: &AttemptState) -> RetryDecision {
        if !class.is_retryable() || state.is_exhausted() {
            return RetryDecision::stop();
        }
        RetryDecision::after(self.delay_for(state.attempt()))
    }
}
