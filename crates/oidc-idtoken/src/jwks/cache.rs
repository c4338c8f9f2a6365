//! Per-issuer key-set cache
//!
//! [`KeySetCache`] puts the [`KeySetFetcher`] behind an [`AsyncAgedCache`]
//! keyed by issuer. The caller picks the freshness window on every lookup: the
//! validator uses a long window normally and a short one to force a refetch
//! after a key miss. Both windows address the same entry.

use super::fetcher::{KeySet, KeySetFetcher};
use super::retriever::DocumentRetriever;
use crate::cache::AsyncAgedCache;
use crate::error::{Result, ValidationError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Key sets by issuer, fetched on demand and shared between concurrent callers
#[derive(Debug)]
pub struct KeySetCache {
    fetcher: KeySetFetcher,
    entries: AsyncAgedCache<String, Arc<KeySet>, ValidationError>,
}

impl KeySetCache {
    /// Create a cache over a fetcher
    pub fn new(fetcher: KeySetFetcher) -> Self {
        Self {
            fetcher,
            entries: AsyncAgedCache::new(),
        }
    }

    /// Create a cache fetching through `retriever`
    pub fn from_retriever(retriever: Arc<dyn DocumentRetriever>) -> Self {
        Self::new(KeySetFetcher::new(retriever))
    }

    /// Get the issuer's key set, fetching it if the cached one is older than `max_age`
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::KeyRetrieval`] if the key set has to be
    /// fetched and the fetch fails.
    pub async fn get(&self, issuer: &str, max_age: Duration) -> Result<Arc<KeySet>> {
        let fetcher = self.fetcher.clone();
        self.entries
            .get_or_add(issuer.to_string(), max_age, move |issuer| async move {
                debug!(issuer = %issuer, "key set cache miss");
                fetcher.get_for_issuer(&issuer).await.map(Arc::new)
            })
            .await
    }

    /// Forget the cached key set for `issuer`
    pub fn invalidate(&self, issuer: &str) {
        self.entries.invalidate(&issuer.to_string());
    }

    /// Forget every cached key set
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of issuers with a cached entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::retriever::RetrievalError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every discovery request, counting them
    #[derive(Default)]
    struct CountingRetriever {
        discovery_requests: AtomicUsize,
    }

    #[async_trait]
    impl DocumentRetriever for CountingRetriever {
        async fn get(&self, url: &str) -> std::result::Result<String, RetrievalError> {
            if url.ends_with("/.well-known/openid-configuration") {
                self.discovery_requests.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                let base = url.trim_end_matches("/.well-known/openid-configuration");
                Ok(format!(r#"{{"jwks_uri":"{base}/jwks"}}"#))
            } else {
                Ok(r#"{"keys":[]}"#.to_string())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_window_reuses_entry() {
        let retriever = Arc::new(CountingRetriever::default());
        let cache = KeySetCache::from_retriever(retriever.clone());

        let first = cache
            .get("https://idp.example", Duration::from_secs(600))
            .await
            .unwrap();
        let second = cache
            .get("https://idp.example", Duration::from_secs(600))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(retriever.discovery_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_window_refetches_same_entry() {
        let retriever = Arc::new(CountingRetriever::default());
        let cache = KeySetCache::from_retriever(retriever.clone());

        let first = cache
            .get("https://idp.example", Duration::from_secs(600))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        let refreshed = cache
            .get("https://idp.example", Duration::ZERO)
            .await
            .unwrap();
        let after = cache
            .get("https://idp.example", Duration::from_secs(600))
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &refreshed));
        assert!(Arc::ptr_eq(&refreshed, &after));
        assert_eq!(cache.len(), 1);
        assert_eq!(retriever.discovery_requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_issuers_are_cached_separately() {
        let retriever = Arc::new(CountingRetriever::default());
        let cache = KeySetCache::from_retriever(retriever.clone());
        let window = Duration::from_secs(600);

        let a = cache.get("https://a.example", window).await.unwrap();
        let b = cache.get("https://b.example", window).await.unwrap();

        assert_eq!(a.jwks_uri(), "https://a.example/jwks");
        assert_eq!(b.jwks_uri(), "https://b.example/jwks");
        assert_eq!(cache.len(), 2);

        cache.invalidate("https://a.example");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
