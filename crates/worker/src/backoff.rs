//! Exponential backoff before a worker requeues a retryable failure
//! (§4.H: "factor 2, base 1 s, cap 10 s").

use std::time::Duration;

use crate::config::WorkerConfig;

/// Delay before the `retry_count`-th requeue. `retry_count` is 1 for the
/// first retry, matching `mark_retry`'s post-increment value.
pub fn backoff_for(retry_count: i32, config: &WorkerConfig) -> Duration {
    let exponent = retry_count.saturating_sub(1).max(0) as u32;
    let factor = config.backoff_factor.saturating_pow(exponent);
    let scaled = config.backoff_base.saturating_mul(factor);
    scaled.min(config.backoff_cap)
}
