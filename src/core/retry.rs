//! Retry helper for whole-object resubmission
//!
//! The batch dispatcher never retries on its own. When a file's units come back
//! without results the orchestrator may resubmit the entire file; this module holds
//! the policy and the loop for doing so.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

/// How many times to attempt an operation and how long to wait between attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    #[serde(with = "duration_millis")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Run `operation` until it succeeds, the policy is exhausted, or `is_retryable`
/// rejects the error
///
/// # Examples
/// ```rust
/// use phiscan::core::retry::{retry_async, RetryPolicy};
///
/// # async fn example() -> Result<u32, String> {
/// let value = retry_async(
///     "submit file",
///     &RetryPolicy::default(),
///     |_err: &String| true,
///     || async { Ok::<u32, String>(3) },
/// )
/// .await?;
/// # Ok(value)
/// # }
/// ```
pub async fn retry_async<F, T, E, Fut, P>(
    operation_name: &str,
    policy: &RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if attempt >= attempts || !is_retryable(&error) {
                    return Err(error);
                }
                log::debug!(
                    "'{}' failed on attempt {}/{}, retrying in {:?}: {}",
                    operation_name,
                    attempt,
                    attempts,
                    policy.delay,
                    error
                );
                sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

/// Serialise durations as integer milliseconds in config files
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
