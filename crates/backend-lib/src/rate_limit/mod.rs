// ============================
// crates/backend-lib/src/rate_limit/mod.rs
// ============================
//! Per-client rate limiting.
//!
//! Every client id (usually an IP address) gets its own [`TokenBucket`],
//! created on first sight. Each entry is dropped a fixed `expiry` after it
//! was created, whatever its traffic, by a one-shot timer task.

mod bucket;

pub use bucket::TokenBucket;

use metrics::{counter, gauge};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use crate::error::AuthError;
use crate::metrics::{RATE_LIMIT_CLIENTS, RATE_LIMIT_REJECTED};

type Buckets = RwLock<HashMap<String, Arc<TokenBucket>>>;

/// Map of client id to token bucket
#[derive(Debug, Clone)]
pub struct RateLimiter {
    buckets: Arc<Buckets>,
    /// Tokens per second
    rate: f64,
    burst: u32,
    /// Lifetime of an entry from its creation
    expiry: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter refilling `rate` tokens per second
    pub fn new(rate: f64, burst: u32, expiry: Duration) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            rate,
            burst,
            expiry,
        }
    }

    /// Create a rate limiter refilling one token every `interval`
    pub fn every(interval: Duration, burst: u32, expiry: Duration) -> Self {
        let rate = if interval.is_zero() {
            f64::INFINITY
        } else {
            1.0 / interval.as_secs_f64()
        };
        Self::new(rate, burst, expiry)
    }

    /// Get the bucket for `client_id`, creating it if needed.
    ///
    /// Concurrent first requests from the same client race on the write
    /// lock; the map is checked again under it so exactly one bucket wins.
    pub fn get_limiter(&self, client_id: &str) -> Arc<TokenBucket> {
        {
            let buckets = self.buckets.read();
            if let Some(bucket) = buckets.get(client_id) {
                return Arc::clone(bucket);
            }
        }

        let mut buckets = self.buckets.write();
        if let Some(bucket) = buckets.get(client_id) {
            return Arc::clone(bucket);
        }

        let bucket = Arc::new(TokenBucket::new(self.rate, self.burst));
        buckets.insert(client_id.to_owned(), Arc::clone(&bucket));
        gauge!(RATE_LIMIT_CLIENTS).set(buckets.len() as f64);
        drop(buckets);

        self.schedule_removal(client_id.to_owned(), &bucket);
        bucket
    }

    /// Consume one token for `client_id`, or fail with
    /// [`AuthError::RateLimitExceeded`].
    pub fn check(&self, client_id: &str) -> Result<(), AuthError> {
        if self.get_limiter(client_id).allow() {
            Ok(())
        } else {
            counter!(RATE_LIMIT_REJECTED).increment(1);
            tracing::warn!(client_id, "rate limit exceeded");
            Err(AuthError::RateLimitExceeded)
        }
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.buckets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    fn schedule_removal(&self, client_id: String, bucket: &Arc<TokenBucket>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(client_id, "no runtime, rate limit entry will not expire");
            return;
        };

        // Weak handles: a dropped limiter must not be kept alive by its timers
        let buckets: Weak<Buckets> = Arc::downgrade(&self.buckets);
        let bucket = Arc::downgrade(bucket);
        let expiry = self.expiry;

        handle.spawn(async move {
            tokio::time::sleep(expiry).await;
            let Some(buckets) = buckets.upgrade() else {
                return;
            };
            let mut buckets = buckets.write();
            // Only remove the entry this timer was created for
            let same = buckets
                .get(&client_id)
                .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), bucket.as_ptr()));
            if same {
                buckets.remove(&client_id);
                gauge!(RATE_LIMIT_CLIENTS).set(buckets.len() as f64);
            }
        });
    }
}
