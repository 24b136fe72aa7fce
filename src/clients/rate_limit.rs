//! Sliding-window admission control for outbound calls.
//!
//! A [`RateLimiter`] counts the calls made for a key during the trailing
//! window and refuses new calls once the quota is used up. Timestamps are
//! pruned lazily on every check, so there is no background task.
//!
//! [`RateLimiters`] holds the two standing limiters used by the request
//! pipeline: one for general API traffic and a stricter one for
//! authentication endpoints.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use shop_api_client::clients::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(60)));
//!
//! assert!(limiter.is_allowed("user-1"));
//! assert!(limiter.is_allowed("user-1"));
//! assert!(!limiter.is_allowed("user-1"));
//!
//! // Other identities have their own bucket
//! assert!(limiter.is_allowed("user-2"));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::clients::OperationKind;

/// Window and quota of one rate-limited traffic class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    max_requests: u32,
    window: Duration,
}

impl RateLimitConfig {
    /// Creates a limit of `max_requests` per `window`.
    #[must_use]
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Default limit for general API traffic: 100 requests per minute.
    #[must_use]
    pub const fn general() -> Self {
        Self::new(100, Duration::from_millis(60_000))
    }

    /// Default limit for authentication traffic: 5 requests per 5 minutes.
    #[must_use]
    pub const fn auth() -> Self {
        Self::new(5, Duration::from_millis(300_000))
    }

    /// Returns the quota per window.
    #[must_use]
    pub const fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Returns the window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.max_requests > 0 && !self.window.is_zero()
    }
}

type Bucket = Arc<Mutex<VecDeque<Instant>>>;

/// Sliding-window rate limiter keyed by caller identity.
///
/// Each key owns a mutex-guarded sequence of admission instants. The outer
/// map lock is only held long enough to look up or insert a bucket, so
/// checks for different keys do not contend on each other.
///
/// Once per window the lookup also sweeps out buckets whose newest call has
/// left the window, so the map only tracks keys seen recently.
///
/// Instants come from [`tokio::time::Instant`], which makes the limiter
/// follow paused and advanced time in tests.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<Buckets>,
}

#[derive(Debug)]
struct Buckets {
    map: HashMap<String, Bucket>,
    swept_at: Instant,
}

// Verify RateLimiter is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RateLimiter>();
};

impl RateLimiter {
    /// Creates a limiter with the given window and quota.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(Buckets {
                map: HashMap::new(),
                swept_at: Instant::now(),
            }),
        }
    }

    /// Returns the limiter's configuration.
    #[must_use]
    pub const fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Checks whether a call for `key` may proceed, and records it if so.
    ///
    /// Admission is binary: a rejected call leaves no trace in the window.
    pub fn is_allowed(&self, key: &str) -> bool {
        let bucket = self.bucket(key);
        let mut timestamps = lock(&bucket);
        let now = Instant::now();
        self.prune(&mut timestamps, now);

        if timestamps.len() >= self.max_len() {
            tracing::debug!(key, limit = self.config.max_requests, "Rate limit reached");
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Returns how many calls `key` may still make in the current window.
    ///
    /// This does not record a call or mutate the stored window.
    #[must_use]
    pub fn remaining(&self, key: &str) -> u32 {
        let Some(bucket) = self.existing_bucket(key) else {
            return self.config.max_requests;
        };
        let timestamps = lock(&bucket);
        let valid = self.count_valid(&timestamps, Instant::now());
        let valid = u32::try_from(valid).unwrap_or(u32::MAX);
        self.config.max_requests.saturating_sub(valid)
    }

    /// Returns how long `key` must wait before a call would be admitted.
    ///
    /// Returns `None` when a call would be admitted right now.
    #[must_use]
    pub fn retry_after(&self, key: &str) -> Option<Duration> {
        let bucket = self.existing_bucket(key)?;
        let timestamps = lock(&bucket);
        let now = Instant::now();
        let valid = self.count_valid(&timestamps, now);
        if valid < self.max_len() {
            return None;
        }

        // The call that frees a slot is the oldest one still inside the window
        let freeing = timestamps.get(timestamps.len() - valid)?;
        Some((*freeing + self.config.window).saturating_duration_since(now))
    }

    /// Forgets all recorded calls for `key`.
    pub fn reset(&self, key: &str) {
        lock(&self.buckets).map.remove(key);
    }

    /// Returns how many keys currently hold a bucket.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        lock(&self.buckets).map.len()
    }

    fn bucket(&self, key: &str) -> Bucket {
        let mut buckets = lock(&self.buckets);
        let now = Instant::now();
        if now.saturating_duration_since(buckets.swept_at) >= self.config.window {
            self.sweep(&mut buckets.map, now);
            buckets.swept_at = now;
        }
        Arc::clone(buckets.map.entry(key.to_string()).or_default())
    }

    fn existing_bucket(&self, key: &str) -> Option<Bucket> {
        lock(&self.buckets).map.get(key).cloned()
    }

    /// Drops buckets with no call left in the window.
    ///
    /// A bucket another caller still holds is kept, so a concurrent check
    /// never records into a bucket that is no longer in the map.
    fn sweep(&self, map: &mut HashMap<String, Bucket>, now: Instant) {
        let before = map.len();
        map.retain(|_, bucket| {
            Arc::strong_count(bucket) > 1
                || lock(bucket)
                    .back()
                    .is_some_and(|&at| !self.is_expired(at, now))
        });
        let evicted = before - map.len();
        if evicted > 0 {
            tracing::debug!(evicted, tracked = map.len(), "Swept idle rate limit buckets");
        }
    }

    fn max_len(&self) -> usize {
        usize::try_from(self.config.max_requests).unwrap_or(usize::MAX)
    }

    fn is_expired(&self, at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(at) > self.config.window
    }

    fn prune(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        while timestamps
            .front()
            .is_some_and(|&at| self.is_expired(at, now))
        {
            timestamps.pop_front();
        }
    }

    fn count_valid(&self, timestamps: &VecDeque<Instant>, now: Instant) -> usize {
        timestamps
            .iter()
            .filter(|&&at| !self.is_expired(at, now))
            .count()
    }
}

/// The standing pair of limiters consulted by the request pipeline.
#[derive(Debug)]
pub struct RateLimiters {
    general: RateLimiter,
    auth: RateLimiter,
}

impl RateLimiters {
    /// Creates the pair from explicit limits.
    #[must_use]
    pub fn new(general: RateLimitConfig, auth: RateLimitConfig) -> Self {
        Self {
            general: RateLimiter::new(general),
            auth: RateLimiter::new(auth),
        }
    }

    /// Returns the limiter for general API traffic.
    #[must_use]
    pub const fn general(&self) -> &RateLimiter {
        &self.general
    }

    /// Returns the limiter for authentication traffic.
    #[must_use]
    pub const fn auth(&self) -> &RateLimiter {
        &self.auth
    }

    /// Returns the limiter guarding operations of `kind`.
    #[must_use]
    pub const fn for_kind(&self, kind: OperationKind) -> &RateLimiter {
        match kind {
            OperationKind::General => &self.general,
            OperationKind::Auth => &self.auth,
        }
    }
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::new(RateLimitConfig::general(), RateLimitConfig::auth())
    }
}

// A poisoned lock only means another caller panicked mid-check; the deque is
// still structurally valid.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
