use std::sync::Arc;

use crate::store::{KvStore, StoreError};

/// Fixed-window request counter. One counter per `requester:window` pair,
/// expiring with the window; counts never carry across windows. Accepts the
/// known boundary behavior that up to 2x the limit can land in a short span
/// straddling two windows.
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    limit: u64,
    window_seconds: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KvStore>, limit: u64, window_seconds: u64) -> Self {
        Self {
            store,
            limit,
            window_seconds: window_seconds.max(1),
        }
    }

    /// Returns whether the request is allowed. Store failures surface as
    /// `Err`; the caller decides the degradation policy.
    pub async fn check(&self, requester_key: &str, now: u64) -> Result<bool, StoreError> {
        let window = now / self.window_seconds;
        let key = format!("rl:{requester_key}:{window}");
        let count = self.store.incr(&key, self.window_seconds).await?;
        Ok(count <= self.limit)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::Clock;
    use crate::store::MemoryStore;

    struct ManualClock(AtomicU64);

    impl Clock for ManualClock {
        fn now_epoch_seconds(&self) -> u64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn limiter(limit: u64, window: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock(AtomicU64::new(1_000)));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        (RateLimiter::new(store, limit, window), clock)
    }

    #[tokio::test]
    async fn fourth_request_in_window_is_denied() {
        let (limiter, clock) = limiter(3, 60);
        let now = clock.now_epoch_seconds();
        for _ in 0..3 {
            assert!(limiter.check("alice", now).await.unwrap());
        }
        assert!(!limiter.check("alice", now).await.unwrap());
    }

    #[tokio::test]
    async fn next_window_starts_a_fresh_count() {
        let (limiter, clock) = limiter(1, 60);
        assert!(limiter.check("alice", 1_000).await.unwrap());
        assert!(!limiter.check("alice", 1_000).await.unwrap());
        clock.0.store(1_060, Ordering::Relaxed);
        assert!(limiter.check("alice", 1_060).await.unwrap());
    }

    #[tokio::test]
    async fn requesters_are_counted_independently() {
        let (limiter, clock) = limiter(1, 60);
        let now = clock.now_epoch_seconds();
        assert!(limiter.check("alice", now).await.unwrap());
        assert!(!limiter.check("alice", now).await.unwrap());
        assert!(limiter.check("bob", now).await.unwrap());
    }
}
