//! In-memory cache for pending ceremony state
//!
//! Ceremony records are short-lived and don't need persistence across
//! restarts; a concurrent map with per-entry deadlines is enough for
//! development and tests.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CacheError, ChallengeCache};

/// Cache entry with expiration
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-memory [`ChallengeCache`] backed by a concurrent map.
///
/// `take` is atomic through the map's `remove`, so two concurrent takes of
/// one key cannot both observe the value.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired entries (called periodically by the embedding
    /// application; `take` already ignores expired values)
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of entries currently held, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ChallengeCache for MemoryCache {
    async fn store(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.entries.remove(key) {
            Some((_, entry)) if entry.expires_at > Instant::now() => Ok(Some(entry.value)),
            _ => Ok(None), // Absent or expired
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
