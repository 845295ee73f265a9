//! Mutation throttle (token bucket)
//!
//! Caps how fast clients can push queue mutations. Reads and subscriptions
//! are never throttled.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

pub struct MutationThrottle {
    bucket: Mutex<Bucket>,
    capacity: f64,
    refill_per_sec: f64,
}

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl MutationThrottle {
    /// # Arguments
    /// * `burst` - Mutations allowed back to back
    /// * `per_second` - Sustained mutations per second
    pub fn new(burst: u32, per_second: u32) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                refilled_at: Instant::now(),
            }),
            capacity: f64::from(burst),
            refill_per_sec: f64::from(per_second),
        }
    }

    /// Take one token; false when the caller must back off
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available
    pub fn available(&self) -> u32 {
        let bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.tokens.floor() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_burst_then_refused() {
        let throttle = MutationThrottle::new(3, 1);
        assert!(throttle.try_acquire());
        assert!(throttle.try_acquire());
        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());
    }

    #[tokio::test]
    async fn test_refills_over_time() {
        let throttle = MutationThrottle::new(2, 20);
        while throttle.try_acquire() {}

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(throttle.try_acquire());
        assert!(throttle.available() <= 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_budget() {
        let throttle = Arc::new(MutationThrottle::new(50, 1));

        let mut handles = vec![];
        for _ in 0..8 {
            let throttle = Arc::clone(&throttle);
            handles.push(tokio::spawn(async move {
                (0..20).filter(|_| throttle.try_acquire()).count()
            }));
        }

        let mut allowed = 0;
        for h in handles {
            allowed += h.await.unwrap();
        }
        assert!((50..=52).contains(&allowed), "allowed {}", allowed);
    }
}
