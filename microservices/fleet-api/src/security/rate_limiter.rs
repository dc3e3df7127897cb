//! Token Bucket Rate Limiter
//!
//! Per-key token buckets with greedy continuous refill. Each key owns an
//! independent bucket that starts full, drains one token per admitted
//! request, and accrues `capacity` tokens per refill period up to the
//! capacity ceiling.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Time source abstraction. Injected at construction so tests can supply a
/// fixed or manually advanced clock.
pub trait Clock: Send + Sync + 'static {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall-clock time source used in production.
#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Rate limiter error types
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit capacity must be greater than zero, got {0}")]
    InvalidCapacity(u32),

    #[error("Rate limit refill period must be greater than zero")]
    InvalidRefillPeriod,

    #[error("Rate limit key must not be empty")]
    InvalidKey,
}

/// Outcome of a single consume attempt. Denial is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining_tokens: u64,
    pub capacity: u64,
    pub retry_after_seconds: u64,
    pub reset_epoch_seconds: i64,
}

/// Per-key bucket state. The fractional balance retains partial refill
/// progress between calls; clients only ever observe whole tokens.
struct TokenBucket {
    available: f64,
    last_refill: DateTime<Utc>,
}

/// Token-bucket rate limiter keyed by caller identity.
#[derive(Clone)]
pub struct RateLimitService {
    buckets: Arc<DashMap<String, TokenBucket>>,
    capacity: u64,
    refill_period: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimitService {
    /// Create a limiter with the given capacity and refill period.
    ///
    /// Fails when either parameter is zero; an invalid limiter must never
    /// come into existence.
    pub fn new(
        clock: Arc<dyn Clock>,
        capacity: u32,
        refill_period: Duration,
    ) -> Result<Self, RateLimitError> {
        if capacity == 0 {
            return Err(RateLimitError::InvalidCapacity(capacity));
        }
        if refill_period.is_zero() {
            return Err(RateLimitError::InvalidRefillPeriod);
        }
        Ok(Self {
            buckets: Arc::new(DashMap::new()),
            capacity: u64::from(capacity),
            refill_period,
            clock,
        })
    }

    /// Attempt to consume one token for `key`.
    ///
    /// An empty key is a programmer error and is rejected; throttling
    /// decisions are reported through [`RateLimitResult::allowed`]. The
    /// refill-then-consume sequence runs under the bucket's map guard, so
    /// concurrent calls for one key never over-grant while other keys
    /// proceed unblocked.
    pub fn try_consume(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        if key.is_empty() {
            return Err(RateLimitError::InvalidKey);
        }

        let now = self.clock.now_utc();
        let capacity = self.capacity as f64;
        let period_secs = self.refill_period.as_secs_f64();
        let rate = capacity / period_secs;

        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket {
                available: capacity,
                last_refill: now,
            });

        // Greedy refill: credit tokens for the elapsed time, clamp at
        // capacity, and advance the marker to now. Fractional credit stays
        // in the balance, so no progress is lost between calls.
        let elapsed_secs = (now - bucket.last_refill).num_milliseconds().max(0) as f64 / 1000.0;
        bucket.available = (bucket.available + elapsed_secs * rate).min(capacity);
        bucket.last_refill = now;

        if bucket.available >= 1.0 {
            bucket.available -= 1.0;
            let refill_secs = ((capacity - bucket.available) / rate).ceil() as i64;
            Ok(RateLimitResult {
                allowed: true,
                remaining_tokens: bucket.available.floor() as u64,
                capacity: self.capacity,
                retry_after_seconds: 0,
                reset_epoch_seconds: now.timestamp() + refill_secs,
            })
        } else {
            let retry_after = ((1.0 - bucket.available) / rate).ceil().max(1.0) as u64;
            Ok(RateLimitResult {
                allowed: false,
                remaining_tokens: 0,
                capacity: self.capacity,
                retry_after_seconds: retry_after,
                reset_epoch_seconds: now.timestamp() + retry_after as i64,
            })
        }
    }
}
