//! Time-aged, single-flight async cache
//!
//! [`AsyncAgedCache`] stores one *computation* per key rather than a value.
//! Callers that arrive while a computation is still running await the same
//! shared future, so N concurrent lookups for an absent key run the factory
//! exactly once.
//!
//! Freshness is decided per call: an entry is fresh iff
//! `now - cached_at <= max_age`, with `max_age` supplied by the caller. The
//! same entry can therefore be "fresh" for a long-window caller and "stale"
//! for a forced-refresh caller.
//!
//! The computation is a [`Shared`] future. It is driven by whichever caller is
//! polling it, so one caller dropping its await hands the work over to the
//! remaining callers instead of cancelling it.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

type Computation<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// Cache entry: a pending-or-ready computation and the instant it was installed
struct CacheEntry<V, E> {
    /// Distinguishes this entry from a later replacement under the same key
    id: u64,
    cached_at: Instant,
    computation: Computation<V, E>,
}

impl<V, E> CacheEntry<V, E> {
    fn is_fresh(&self, now: Instant, max_age: Duration) -> bool {
        now.saturating_duration_since(self.cached_at) <= max_age
    }
}

/// Concurrency-safe cache of async computations, aged per lookup
///
/// Unrelated keys never serialize on each other: installation happens under
/// the [`DashMap`] shard lock for the key only, and no lock is held while a
/// computation runs.
///
/// Computations that resolve to `Err` are evicted once they complete, so a
/// failed fetch is shared by the callers that were already waiting on it but
/// is not served to later callers.
///
/// # Example
///
/// ```rust
/// use oidc_idtoken::cache::AsyncAgedCache;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let cache: AsyncAgedCache<String, u32, String> = AsyncAgedCache::new();
///
/// let value = cache
///     .get_or_add("answer".to_string(), Duration::from_secs(60), |_| async { Ok(42) })
///     .await;
/// assert_eq!(value, Ok(42));
/// # });
/// ```
pub struct AsyncAgedCache<K, V, E> {
    entries: DashMap<K, CacheEntry<V, E>>,
    next_id: AtomicU64,
}

impl<K: Eq + Hash, V, E> fmt::Debug for AsyncAgedCache<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAgedCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<K, V, E> Default for AsyncAgedCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> AsyncAgedCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Return the cached computation for `key`, or install one built by `factory`
    ///
    /// An existing entry is reused while its age is at most `max_age`, even if
    /// its computation is still pending. Otherwise `factory` is invoked once
    /// and its future replaces the stale (or missing) entry atomically.
    ///
    /// # Errors
    ///
    /// Returns the error produced by the computation. The failed entry is
    /// evicted so the next call runs the factory again.
    pub async fn get_or_add<F, Fut>(&self, key: K, max_age: Duration, factory: F) -> Result<V, E>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (id, computation) = self.lookup_or_install(key.clone(), max_age, factory);
        let result = computation.await;

        if result.is_err() && self.entries.remove_if(&key, |_, entry| entry.id == id).is_some() {
            trace!(entry = id, "evicted failed cache computation");
        }

        result
    }

    fn lookup_or_install<F, Fut>(
        &self,
        key: K,
        max_age: Duration,
        factory: F,
    ) -> (u64, Computation<V, E>)
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let now = Instant::now();

        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get();
                if entry.is_fresh(now, max_age) {
                    return (entry.id, entry.computation.clone());
                }

                let replacement = self.start(occupied.key().clone(), factory, now);
                let handle = (replacement.id, replacement.computation.clone());
                trace!(entry = handle.0, "replacing stale cache entry");
                occupied.insert(replacement);
                handle
            }
            Entry::Vacant(vacant) => {
                let entry = self.start(vacant.key().clone(), factory, now);
                let handle = (entry.id, entry.computation.clone());
                trace!(entry = handle.0, "installing cache entry");
                vacant.insert(entry);
                handle
            }
        }
    }

    fn start<F, Fut>(&self, key: K, factory: F, now: Instant) -> CacheEntry<V, E>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        CacheEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            cached_at: now,
            computation: factory(key).boxed().shared(),
        }
    }

    /// Drop the entry for `key`, if any
    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries, fresh or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
