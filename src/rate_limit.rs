// Per-client token buckets, swept of idle keys by the background sweeper

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::{Clock, MonotonicClock};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    // Tokens per bucket, also tokens restored per window
    pub capacity: u32,
    pub window: Duration,
    // Buckets untouched for this long are evicted by the sweep
    pub idle_timeout: Duration,
    // Ceiling on tracked keys; new keys past it are denied
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            window: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(60 * 60),
            max_clients: 100_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    // How long until one token is back
    Denied { retry_after: Duration },
}

impl Decision {
    #[cfg(test)]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

// State for one client key
#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: u64,
    last_access: u64,
}

impl Bucket {
    fn full(capacity: u32, now: u64) -> Self {
        Self {
            tokens: f64::from(capacity),
            last_refill: now,
            last_access: now,
        }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    // Tokens restored per millisecond
    refill_per_ms: f64,
    buckets: DashMap<String, Bucket>,
    // Live bucket count; DashMap::len locks every shard
    tracked: AtomicUsize,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::default()))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let window_ms = config.window.as_millis().max(1) as f64;
        let refill_per_ms = f64::from(config.capacity) / window_ms;

        info!(
            capacity = config.capacity,
            window_secs = config.window.as_secs(),
            idle_secs = config.idle_timeout.as_secs(),
            "Rate limiter initialized"
        );

        Self {
            config,
            refill_per_ms,
            buckets: DashMap::new(),
            tracked: AtomicUsize::new(0),
            clock,
        }
    }

    // Take one token for `key`, creating a full bucket on first sight.
    // Denied checks still bump the access time.
    pub fn admit(&self, key: &str) -> Decision {
        let now = self.clock.now_millis();

        // Only this key's shard is locked from here on
        let mut bucket = match self.buckets.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                if !self.reserve_slot() {
                    warn!(client = %key, "Bucket limit reached, denying new client");
                    return Decision::Denied {
                        retry_after: self.config.window,
                    };
                }
                debug!(client = %key, "Creating new rate limit bucket");
                entry.insert(Bucket::full(self.config.capacity, now))
            }
        };

        self.refill(&mut bucket, now);
        bucket.last_access = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Decision::Allowed
        } else {
            let missing = 1.0 - bucket.tokens;
            let wait_ms = (missing / self.refill_per_ms).ceil().max(1.0) as u64;
            Decision::Denied {
                retry_after: Duration::from_millis(wait_ms),
            }
        }
    }

    // Add tokens for the time since the last refill, capped at capacity
    fn refill(&self, bucket: &mut Bucket, now: u64) {
        let elapsed = now.saturating_sub(bucket.last_refill);
        if elapsed == 0 {
            return;
        }
        let capacity = f64::from(self.config.capacity);
        bucket.tokens = (bucket.tokens + elapsed as f64 * self.refill_per_ms).min(capacity);
        bucket.last_refill = now;
    }

    // Claim room for one more bucket, false at the ceiling
    fn reserve_slot(&self) -> bool {
        let max = self.config.max_clients;
        self.tracked
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .is_ok()
    }

    // Drop every bucket idle for longer than the idle timeout, returns how many went
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let idle_ms = u64::try_from(self.config.idle_timeout.as_millis()).unwrap_or(u64::MAX);
        let mut removed = 0;

        self.buckets.retain(|_, bucket| {
            let keep = now.saturating_sub(bucket.last_access) <= idle_ms;
            if !keep {
                removed += 1;
                self.tracked.fetch_sub(1, Ordering::AcqRel);
            }
            keep
        });

        if removed > 0 {
            debug!(removed, remaining = self.tracked(), "Cleaned up old rate limit buckets");
        }
        removed
    }

    pub fn tracked(&self) -> usize {
        self.tracked.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn remaining(&self, key: &str) -> u32 {
        self.buckets
            .get(key)
            .map(|b| b.tokens as u32)
            .unwrap_or(self.config.capacity)
    }
}
