//! Priority-tiered artifact cache.
//!
//! Entries expire at `created_at + ttl(priority)`. A lookup on an expired
//! entry is a miss; expired entries stay in the map until
//! [`ArtifactCache::clear_expired`] or a replacement `put`.

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::priority::Priority;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Canonical cache keys.
pub struct CacheKey;

impl CacheKey {
    /// Key for a content item with a known identity.
    pub fn content(id: u64) -> String {
        format!("content:{id}")
    }

    /// Key for a URL without a content identity.
    pub fn url(url: &str) -> String {
        format!("url:{:x}", Sha256::digest(url.as_bytes()))
    }
}

/// A cached rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub priority: Priority,
}

impl CacheEntry {
    /// An entry is live up to and including `expires_at`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

/// Result of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    pub content: Option<String>,
    pub hit: bool,
}

impl CacheLookup {
    fn miss() -> Self {
        Self {
            content: None,
            hit: false,
        }
    }
}

/// Metadata row for cache browsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntryInfo {
    pub key: String,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub priority: Priority,
    pub expired: bool,
}

/// Cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub live: usize,
    pub expired: usize,
    pub hits: u64,
    pub misses: u64,
}

/// In-memory artifact cache.
pub struct ArtifactCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ArtifactCache {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a key. Expired entries count as misses.
    pub fn get(&self, key: &str) -> CacheLookup {
        let now = self.clock.now();
        let content = self
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.content.clone());

        match content {
            Some(content) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                CacheLookup {
                    content: Some(content),
                    hit: true,
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                CacheLookup::miss()
            }
        }
    }

    /// Store content under `key` with the TTL of `priority`. Replaces any
    /// existing entry. Returns false for blocked priority, which is never
    /// cached.
    pub fn put(&self, key: &str, content: String, priority: Priority) -> bool {
        let Some(ttl) = self.config.ttl(priority) else {
            warn!(key, "Refusing to cache content for blocked priority");
            return false;
        };

        let created_at = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        debug!(key, %priority, %expires_at, bytes = content.len(), "Cache entry stored");
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                content,
                created_at,
                expires_at,
                priority,
            },
        );
        true
    }

    /// Remove one key. Removing an absent key is not an error.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove a list of keys, returning how many existed.
    pub fn bulk_delete<S: AsRef<str>>(&self, keys: &[S]) -> usize {
        keys.iter().filter(|k| self.delete(k.as_ref())).count()
    }

    /// Remove every entry with `expires_at < now`.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at >= now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Expired cache entries cleared");
        }
        removed
    }

    /// Full entry for a key, live or expired.
    pub fn view(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Whether a key has a live entry. Does not touch hit/miss counters.
    pub fn has_live(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries.get(key).is_some_and(|entry| entry.is_live(now))
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.entries.len();
        let live = self.entries.iter().filter(|e| e.is_live(now)).count();
        CacheStats {
            entries,
            live,
            expired: entries.saturating_sub(live),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Entry metadata, newest first.
    pub fn list_entries(&self) -> Vec<CacheEntryInfo> {
        let now = self.clock.now();
        let mut infos: Vec<CacheEntryInfo> = self
            .entries
            .iter()
            .map(|entry| CacheEntryInfo {
                key: entry.key.clone(),
                size_bytes: entry.content.len(),
                created_at: entry.created_at,
                expires_at: entry.expires_at,
                priority: entry.priority,
                expired: !entry.is_live(now),
            })
            .collect();
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.key.cmp(&b.key)));
        infos
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new(CacheConfig::default(), Arc::new(SystemClock))
    }
}
