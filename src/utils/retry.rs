use std::future::Future;
use std::time::Duration;

/// Exponential backoff: sleep `start`, then `start * factor`, ... and give up
/// once the next sleep would reach `border`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub start: Duration,
    pub factor: u32,
    pub border: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            start: Duration::from_millis(100),
            factor: 2,
            border: Duration::from_secs(10),
        }
    }
}

impl Backoff {
    /// Runs `op` until it succeeds or the sleep reaches the border.
    /// Returns the last error when retries are exhausted.
    pub async fn retry<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut sleep = self.start;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if sleep >= self.border => {
                    tracing::error!("{} failed, giving up: {}", label, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("{} failed, retrying in {:?}: {}", label, sleep, e);
                    tokio::time::sleep(sleep).await;
                    sleep *= self.factor;
                }
            }
        }
    }
}
