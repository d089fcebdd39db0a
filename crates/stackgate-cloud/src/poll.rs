//! Propagation-aware polling
//!
//! Some failures only mean "not there yet": a freshly attached file system
//! that cannot be mounted, a role the compute service cannot see. The caller
//! names those error codes; the poller repeats the operation while such a
//! code comes back and the wall-clock budget measured from `started_at` has
//! not run out. Any other failure is returned unchanged.

use crate::error::ErrorCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Budget and pacing for propagation retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationPolicy {
    /// Give up once this much time has passed since the start instant
    pub max_elapsed: Duration,

    /// Pause between attempts; zero retries immediately
    pub interval: Duration,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            max_elapsed: Duration::from_secs(5 * 60),
            interval: Duration::from_secs(1),
        }
    }
}

impl PropagationPolicy {
    pub fn new(max_elapsed: Duration) -> Self {
        Self {
            max_elapsed,
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Run `operation` until it succeeds, fails with a code rejected by
/// `is_retryable`, or `policy.max_elapsed` has passed since `started_at`.
pub async fn poll_until_success<T, E, F, Fut, P>(
    mut operation: F,
    is_retryable: P,
    started_at: Instant,
    policy: PropagationPolicy,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorCode + std::fmt::Display,
    P: Fn(&str) -> bool,
{
    let mut attempt = 1u32;
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let retryable = error.error_code().is_some_and(&is_retryable);
        if !retryable || started_at.elapsed() >= policy.max_elapsed {
            return Err(error);
        }

        tracing::warn!(
            "Attempt {} failed with {}, waiting for propagation: {}",
            attempt,
            error.error_code().unwrap_or("unknown"),
            error
        );
        if !policy.interval.is_zero() {
            tokio::time::sleep(policy.interval).await;
        }
        attempt += 1;
    }
}
