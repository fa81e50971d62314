//! Transient ceremony state storage
//!
//! Ceremony options live in a cache between `begin` and `finish`:
//! - **`ChallengeCache`** is the port onto the key-value technology the
//!   application runs (Redis and friends in production, [`MemoryCache`] for
//!   development and tests). Values are opaque text to the backend.
//! - **`OptionsCache`** sits on top and owns the record format: JSON
//!   serialization of the typed options, key namespacing, and the TTL rule.
//!
//! Consumption is a single atomic take so that one pending record can satisfy
//! at most one finish, even under concurrent attempts.

mod memory;

pub use memory::MemoryCache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Record lifetime when the ceremony options carry no timeout
const DEFAULT_TTL: Duration = Duration::from_secs(120);

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    /// A present record that does not decode; distinct from an absent record.
    #[error("stored ceremony state is invalid: {0}")]
    InvalidState(#[from] serde_json::Error),
}

/// Port onto the key-value store holding pending ceremony state.
///
/// Implementations must be thread-safe and SHOULD make `take` atomic
/// (Redis `GETDEL`, a transactional read-delete, or a concurrent map's
/// remove); the single-use guarantee of the ceremony services rests on it.
#[async_trait]
pub trait ChallengeCache: Send + Sync {
    /// Store a value under the key for at most `ttl`.
    async fn store(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Atomically retrieve and remove a value. `None` when no live record
    /// exists for the key.
    async fn take(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Remove a value; removing an absent key is not an error. Returns
    /// whether a record was present.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}

#[async_trait]
impl<T: ChallengeCache + ?Sized> ChallengeCache for Arc<T> {
    async fn store(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        (**self).store(key, value, ttl).await
    }

    async fn take(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).take(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        (**self).delete(key).await
    }
}

/// Typed adapter between ceremony options and the text cache.
///
/// Each ceremony kind gets its own namespace so authentication and
/// registration records for the same session key never collide on a shared
/// backend.
#[derive(Debug)]
pub struct OptionsCache<C> {
    cache: C,
    namespace: &'static str,
}

impl<C: ChallengeCache> OptionsCache<C> {
    pub fn new(cache: C, namespace: &'static str) -> Self {
        Self { cache, namespace }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Serialize and store options under the namespaced key.
    ///
    /// The record outlives the client-facing ceremony window by a factor of
    /// two: TTL is `2 * timeout_ms / 1000` seconds when the options carry a
    /// timeout, 120 seconds otherwise.
    pub async fn save<O>(
        &self,
        key: &str,
        options: &O,
        timeout_ms: Option<u32>,
    ) -> Result<(), CacheError>
    where
        O: Serialize + Sync,
    {
        let body = serde_json::to_string(options)?;
        let ttl = ttl_for(timeout_ms);
        self.cache.store(&self.scoped(key), &body, ttl).await?;

        tracing::debug!(
            namespace = self.namespace,
            key = %key,
            ttl_secs = ttl.as_secs(),
            "ceremony options stored"
        );
        Ok(())
    }

    /// Atomically load and remove the options stored under the key.
    ///
    /// Returns `None` when no record exists (expired, consumed, or never
    /// stored). Binary fields come back byte-identical to what was saved;
    /// the typed schema re-decodes their base64url text on the way out.
    pub async fn consume<O>(&self, key: &str) -> Result<Option<O>, CacheError>
    where
        O: DeserializeOwned,
    {
        match self.cache.take(&self.scoped(key)).await? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    /// Drop any record under the key. Idempotent.
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.cache.delete(&self.scoped(key)).await
    }
}

fn ttl_for(timeout_ms: Option<u32>) -> Duration {
    match timeout_ms {
        Some(ms) => Duration::from_secs(u64::from(ms) * 2 / 1000),
        None => DEFAULT_TTL,
    }
}
