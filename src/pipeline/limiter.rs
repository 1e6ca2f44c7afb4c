//! Per-task randomized pre-request delay.
//!
//! Each task delays only itself before its first request, so simultaneous
//! task starts do not burst against the target server. This is not a global
//! limiter: overall request rate is bounded by pool size over average delay.

use std::time::Duration;

/// Draw a delay uniformly from `[min, max]`. Pure; the async sleep lives in
/// [`wait`].
pub fn jitter(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let span = (max - min).as_millis() as u64;
    min + Duration::from_millis(fastrand::u64(0..=span))
}

/// Suspend the calling task for a random delay within the configured bounds.
pub async fn wait(min_ms: u64, max_ms: u64) {
    let delay = jitter(Duration::from_millis(min_ms), Duration::from_millis(max_ms));
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
