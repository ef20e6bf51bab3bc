// src/query.rs
//! Keyed query cache and retry policy for collaborator fetches.
//!
//! Entries carry the instant they were fetched: inside `fresh_for` they
//! are served without a network call, after that they are still readable
//! (stale data stays on screen) until `retain_for` passes without any
//! access, at which point moka evicts them.

use backon::{ExponentialBuilder, Retryable};
use moka::sync::Cache;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::error::ApiError;
use crate::utils::short_duration;

const DEFAULT_CACHE_CAPACITY: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub fresh_for: Duration,
    pub retain_for: Duration,
}

impl CachePolicy {
    pub const JOBS: Self = Self {
        fresh_for: Duration::from_secs(5 * 60),
        retain_for: Duration::from_secs(10 * 60),
    };

    pub const FAVORITES: Self = Self {
        fresh_for: Duration::from_secs(10 * 60),
        retain_for: Duration::from_secs(30 * 60),
    };
}

struct CachedEntry<V> {
    value: Arc<V>,
    fetched_at: Instant,
}

impl<V> Clone for CachedEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            fetched_at: self.fetched_at,
        }
    }
}

pub struct QueryCache<K, V> {
    entries: Cache<K, CachedEntry<V>>,
    policy: CachePolicy,
}

impl<K, V> QueryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn new(policy: CachePolicy) -> Self {
        let entries = Cache::builder()
            .max_capacity(DEFAULT_CACHE_CAPACITY)
            .time_to_idle(policy.retain_for)
            .build();

        Self { entries, policy }
    }

    /// Cached value regardless of age.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).map(|entry| entry.value)
    }

    /// Cached value only while it is still fresh.
    pub fn get_fresh(&self, key: &K) -> Option<Arc<V>> {
        self.entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.policy.fresh_for)
            .map(|entry| entry.value)
    }

    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.insert(
            key,
            CachedEntry {
                value: Arc::clone(&value),
                fetched_at: Instant::now(),
            },
        );
        value
    }

}

/// Retry schedule applied to collaborator fetches (never to mutations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_retries)
    }
}

/// Run `op`, retrying retryable failures with exponential backoff.
pub async fn fetch_with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    op.retry(policy.backoff())
        .when(|e: &ApiError| e.should_retry())
        .notify(|e, delay| {
            warn!(
                "{} failed, retrying after {}: {}",
                label,
                short_duration(delay),
                e
            )
        })
        .await
}

/// Counts operations in flight. The count drops when the guard does,
/// including when the owning future is cancelled.
#[derive(Debug, Default)]
pub struct InFlight(AtomicUsize);

impl InFlight {
    pub fn enter(&self) -> InFlightGuard<'_> {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(&self.0)
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

pub struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test(start_paused = true)]
    async fn test_entry_goes_stale_but_stays_readable() {
        let cache: QueryCache<String, u64> = QueryCache::new(CachePolicy::JOBS);
        cache.insert("rust".to_string(), 45);

        assert_eq!(cache.get_fresh(&"rust".to_string()).as_deref(), Some(&45));

        tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;
        assert!(cache.get_fresh(&"rust".to_string()).is_none());
        assert_eq!(cache.get(&"rust".to_string()).as_deref(), Some(&45));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_refreshes_entry() {
        let cache: QueryCache<&'static str, u64> = QueryCache::new(CachePolicy::FAVORITES);
        cache.insert("favorites", 1);
        tokio::time::advance(Duration::from_secs(11 * 60)).await;
        assert!(cache.get_fresh(&"favorites").is_none());

        cache.insert("favorites", 2);
        assert_eq!(cache.get_fresh(&"favorites").as_deref(), Some(&2));
    }

    // Retention runs on moka's wall clock, so these use real sleeps.
    #[test]
    fn test_idle_entries_are_evicted_after_retention() {
        let policy = CachePolicy {
            fresh_for: Duration::from_millis(50),
            retain_for: Duration::from_millis(200),
        };
        let cache: QueryCache<&'static str, u64> = QueryCache::new(policy);
        cache.insert("jobs", 45);

        std::thread::sleep(Duration::from_millis(500));
        assert!(cache.get(&"jobs").is_none());
    }

    #[test]
    fn test_reads_keep_entries_retained() {
        let policy = CachePolicy {
            fresh_for: Duration::from_millis(50),
            retain_for: Duration::from_millis(400),
        };
        let cache: QueryCache<&'static str, u64> = QueryCache::new(policy);
        cache.insert("jobs", 45);

        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(200));
            assert_eq!(cache.get(&"jobs").as_deref(), Some(&45));
        }
        assert!(cache.get_fresh(&"jobs").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_server_errors_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result = fetch_with_retry("list jobs", &RetryPolicy::default(), move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 3 {
                Err(ApiError::Http {
                    status: 503,
                    message: "busy".to_string(),
                })
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: Result<(), _> =
            fetch_with_retry("list jobs", &RetryPolicy::default(), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Transport("network down".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_fail_immediately() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: Result<(), _> =
            fetch_with_retry("list favorites", &RetryPolicy::default(), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Http {
                    status: 401,
                    message: "Unauthorized".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(ApiError::Http { status: 401, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let in_flight = InFlight::default();
        {
            let _a = in_flight.enter();
            let _b = in_flight.enter();
            assert!(in_flight.is_active());
        }
        assert!(!in_flight.is_active());
    }
}
