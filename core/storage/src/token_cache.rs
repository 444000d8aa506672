//! TTL-bounded cache of client-credential tokens.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use picbed_common::{Clock, Error, Result};

use crate::store::{ClientStore, ClientStoreExt};

/// A token persisted with its absolute expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenCacheEntry {
    /// Bearer token value.
    pub access_token: String,
    /// Lifetime reported by the issuer, in seconds.
    #[serde(default)]
    pub expires_in: i64,
    /// Expiry as milliseconds since the Unix epoch.
    pub expire: i64,
}

impl TokenCacheEntry {
    /// Check whether the entry can still be used at `now_millis`.
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        self.expire > now_millis
    }
}

/// A freshly issued token as returned by the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Bearer token value.
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Token cache keyed by client identifier.
///
/// Entries live in the client store under `<namespace>:<client_id>` and are
/// validated lazily on each lookup; there is no refresh ahead of expiry.
/// Concurrent refreshes race benignly, the last write wins.
pub struct TokenCache {
    store: Arc<dyn ClientStore>,
    clock: Arc<dyn Clock>,
    namespace: String,
}

impl TokenCache {
    /// Create a cache over `store` using `namespace` as key prefix.
    pub fn new(store: Arc<dyn ClientStore>, clock: Arc<dyn Clock>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            namespace: namespace.into(),
        }
    }

    fn key(&self, client_id: &str) -> String {
        format!("{}:{}", self.namespace, client_id)
    }

    /// Read the cached entry for `client_id`, if any.
    ///
    /// Unparseable entries are treated as absent.
    pub async fn cached(&self, client_id: &str) -> Result<Option<TokenCacheEntry>> {
        let key = self.key(client_id);
        let loaded: Result<Option<TokenCacheEntry>> = self.store.get_json(&key).await;
        match loaded {
            Ok(entry) => Ok(entry),
            Err(Error::Serialization(e)) => {
                debug!("Ignoring unreadable token cache entry {}: {}", key, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Return a valid token for `client_id`, calling `issue` at most once.
    ///
    /// # Postconditions
    /// - A cached, unexpired token is returned without calling `issue`
    /// - Otherwise the new token is persisted with
    ///   `expire = now + expires_in * 1000` before being returned
    ///
    /// # Errors
    /// - Whatever `issue` fails with; nothing is cached in that case
    pub async fn get_token<F, Fut>(&self, client_id: &str, issue: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedToken>>,
    {
        if let Some(entry) = self.cached(client_id).await? {
            if entry.is_valid_at(self.clock.now_millis()) {
                debug!("Using cached token for {}", client_id);
                return Ok(entry.access_token);
            }
        }

        debug!("Issuing new token for {}", client_id);
        let issued = issue().await?;
        let entry = TokenCacheEntry {
            access_token: issued.access_token,
            expires_in: issued.expires_in,
            expire: self
                .clock
                .now_millis()
                .saturating_add(issued.expires_in.saturating_mul(1000)),
        };
        self.store.set_json(&self.key(client_id), &entry).await?;

        Ok(entry.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use picbed_common::FixedClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOW: i64 = 1_700_000_000_000;

    fn cache_with(store: &MemoryStore) -> TokenCache {
        TokenCache::new(
            Arc::new(store.clone()),
            Arc::new(FixedClock::from_millis(NOW)),
            "mpToken",
        )
    }

    async fn seed(store: &MemoryStore, expire: i64) {
        let entry = TokenCacheEntry {
            access_token: "cached".to_string(),
            expires_in: 7200,
            expire,
        };
        store.set_json("mpToken:app", &entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpired_entry_reused_without_issuing() {
        let store = MemoryStore::new();
        seed(&store, NOW + 1).await;
        let cache = cache_with(&store);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let token = cache
            .get_token("app", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(IssuedToken {
                    access_token: "fresh".to_string(),
                    expires_in: 7200,
                })
            })
            .await
            .unwrap();

        assert_eq!(token, "cached");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_entry_issues_once_and_persists() {
        let store = MemoryStore::new();
        seed(&store, NOW).await;
        let cache = cache_with(&store);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let token = cache
            .get_token("app", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(IssuedToken {
                    access_token: "fresh".to_string(),
                    expires_in: 7200,
                })
            })
            .await
            .unwrap();

        assert_eq!(token, "fresh");
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let entry = cache.cached("app").await.unwrap().unwrap();
        assert_eq!(entry.expire, NOW + 7_200_000);
        assert_eq!(entry.access_token, "fresh");
    }

    #[tokio::test]
    async fn test_issue_failure_caches_nothing() {
        let store = MemoryStore::new();
        let cache = cache_with(&store);

        let result = cache
            .get_token("app", || async { Err(Error::Authentication("denied".to_string())) })
            .await;

        assert!(matches!(result, Err(Error::Authentication(_))));
        assert!(cache.cached("app").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_garbage_entry_treated_as_missing() {
        let store = MemoryStore::with_entries([("mpToken:app", "garbage")]);
        let cache = cache_with(&store);

        let token = cache
            .get_token("app", || async {
                Ok(IssuedToken {
                    access_token: "fresh".to_string(),
                    expires_in: 60,
                })
            })
            .await
            .unwrap();
        assert_eq!(token, "fresh");
    }

    #[tokio::test]
    async fn test_huge_lifetime_saturates() {
        let store = MemoryStore::new();
        let cache = cache_with(&store);

        cache
            .get_token("app", || async {
                Ok(IssuedToken {
                    access_token: "forever".to_string(),
                    expires_in: i64::MAX,
                })
            })
            .await
            .unwrap();

        let entry = cache.cached("app").await.unwrap().unwrap();
        assert_eq!(entry.expire, i64::MAX);
    }
}
