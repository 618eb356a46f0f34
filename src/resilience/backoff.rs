//! Retry delays.

use rand::Rng;
use std::time::Duration;

/// Linear backoff: `base_ms * attempt`, plus up to 10% jitter.
pub fn linear_backoff(attempt: u32, base_ms: u64) -> Duration {
    with_jitter(base_ms.saturating_mul(attempt as u64))
}

fn with_jitter(delay_ms: u64) -> Duration {
    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}
