//! Persisted client-state accessor.
//!
//! Upload strategies never touch storage directly: backend selection,
//! per-backend configuration and cached tokens all flow through a
//! [`ClientStore`] injected into the upload context.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use picbed_common::{Error, Result};

/// Key holding the active backend identifier.
pub const BACKEND_KEY: &str = "imgHost";

/// Key holding the git-hosting shared-pool flag (`"true"` enables it).
pub const SHARED_POOL_KEY: &str = "useSharedPool";

/// Key holding a backend's configuration object.
pub fn config_key(backend_id: &str) -> String {
    format!("{}Config", backend_id)
}

/// String key-value store holding persisted client state.
///
/// Concurrent writers are last-writer-wins; implementations need no
/// transactional guarantees.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Typed JSON helpers over any [`ClientStore`].
#[async_trait]
pub trait ClientStoreExt: ClientStore {
    /// Read and deserialize a JSON value.
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| Error::Serialization(format!("Invalid JSON under '{}': {}", key, e))),
            None => Ok(None),
        }
    }

    /// Serialize and write a JSON value.
    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }

    /// Load a backend configuration object, failing if it is absent or malformed.
    async fn backend_config<T: DeserializeOwned>(&self, backend_id: &str) -> Result<T> {
        let key = config_key(backend_id);
        let raw = self
            .get(&key)
            .await?
            .ok_or_else(|| Error::ConfigMissing(format!("No configuration stored under '{}'", key)))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigMissing(format!("Unparseable configuration '{}': {}", key, e)))
    }
}

impl<S: ClientStore + ?Sized> ClientStoreExt for S {}

/// In-memory client store.
///
/// Useful for testing and embedding. All data is lost on drop.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(map)),
        }
    }

    fn lock_error() -> Error {
        Error::Io(std::io::Error::other("Memory store lock poisoned"))
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| Self::lock_error())?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_error())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_error())?;
        entries.remove(key);
        Ok(())
    }
}
