use std::time::Duration;

use async_trait::async_trait;

/// Source of the pauses taken between mail API requests.
#[async_trait(?Send)]
pub trait Delay {
    async fn pause(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait(?Send)]
impl Delay for TokioDelay {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
