use std::time::Duration;

use async_trait::async_trait;

/// How batch calls are spaced and sized.
#[derive(Debug, Clone)]
pub struct RatePolicy {
    /// Pause between two consecutive calls of a batch. Default: 1s.
    pub interval: Duration,
    /// Largest batch `analyze_image_batch` accepts. Default: 20.
    pub max_batch_size: usize,
    /// Images sent in one multi-image request; extra paths are skipped. Default: 4.
    pub max_images_per_request: usize,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_batch_size: 20,
            max_images_per_request: 4,
        }
    }
}

/// Waits between rate-limited calls. Swap it out to run batches without real
/// timers.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, interval: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, interval: Duration) {
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
}
