use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Keeps request-issuing operations at least `minimum` apart.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    minimum: Duration,
    last_action: Instant,
}

impl RateLimiter {
    pub fn new(minimum: Duration) -> Self {
        Self {
            minimum,
            last_action: Instant::now(),
        }
    }

    pub fn minimum(&self) -> Duration {
        self.minimum
    }

    pub fn set_minimum(&mut self, minimum: Duration) {
        self.minimum = minimum;
    }

    /// Waits out the rest of the interval since the previous turn, then
    /// stamps the time the wait ended.
    pub async fn await_turn(&mut self) {
        let elapsed = self.last_action.elapsed();
        if elapsed < self.minimum {
            let remaining = self.minimum - elapsed;
            tracing::trace!(?remaining, "rate limited");
            sleep(remaining).await;
        }
        self.last_action = Instant::now();
    }
}
