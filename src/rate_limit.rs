use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Per-user leaky counter.
///
/// Every accepted request bumps the user's counter and schedules exactly one
/// decrement `window` later. This is not a sliding window: each decrement is
/// tied to its own increment, whatever arrives in between.
#[derive(Clone)]
pub struct RateLimiter {
    counters: Arc<Mutex<HashMap<u64, u32>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            counters: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Try to admit one request from `user_id`. Rejected requests leave the
    /// counter untouched.
    pub async fn acquire(&self, user_id: u64) -> bool {
        {
            let mut counters = self.counters.lock().await;
            let count = counters.entry(user_id).or_insert(0);
            if *count >= self.max_requests {
                warn!("Rate limit hit for user {} ({} in flight)", user_id, count);
                return false;
            }
            *count += 1;
        }

        let limiter = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limiter.window).await;
            limiter.release(user_id).await;
        });
        true
    }

    /// Current counter for `user_id`.
    #[cfg(test)]
    pub async fn count(&self, user_id: u64) -> u32 {
        self.counters
            .lock()
            .await
            .get(&user_id)
            .copied()
            .unwrap_or(0)
    }

    async fn release(&self, user_id: u64) {
        let mut counters = self.counters.lock().await;
        if let Some(count) = counters.get_mut(&user_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counters.remove(&user_id);
                debug!("Rate limit counter for user {} drained", user_id);
            }
        }
    }
}
