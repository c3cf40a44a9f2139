//! Small in-process response cache.
//!
//! Values are stored as JSON bytes with a per-entry deadline. Expired entries
//! behave as misses and are dropped on read or by [`ResponseCache::purge_expired`].

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug)]
struct CacheEntry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

#[derive(Clone, Debug)]
pub struct ResponseCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let decoded = {
            let entry = self.entries.get(key)?;
            if entry.expires_at <= now {
                None
            } else {
                Some(serde_json::from_slice::<T>(&entry.bytes))
            }
        };

        match decoded {
            Some(Ok(value)) => {
                metrics::counter!("cache_lookups_total", "result" => "hit").increment(1);
                Some(value)
            }
            Some(Err(e)) => {
                tracing::warn!(key, error = %e, "Dropping undecodable cache entry");
                self.entries.remove(key);
                None
            }
            None => {
                metrics::counter!("cache_lookups_total", "result" => "expired").increment(1);
                self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
                None
            }
        }
    }

    /// Store a value with the default time to live.
    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: &T) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl<T: Serialize>(&self, key: impl Into<String>, value: &T, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.entries.insert(
                    key.into(),
                    CacheEntry {
                        bytes,
                        expires_at: Instant::now() + ttl,
                    },
                );
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode cache entry"),
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(self.entries.len())
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key helpers, kept together so invalidation matches reads.
pub mod keys {
    use uuid::Uuid;

    pub const PUBLIC_QUIZZES_PREFIX: &str = "quizzes:public:";
    pub const PUBLIC_FLASHCARD_SETS_PREFIX: &str = "flashcard-sets:public:";

    pub fn public_quizzes(page: u32) -> String {
        format!("{PUBLIC_QUIZZES_PREFIX}{page}")
    }

    pub fn public_flashcard_sets(page: u32) -> String {
        format!("{PUBLIC_FLASHCARD_SETS_PREFIX}{page}")
    }

    pub fn quiz(quiz_id: Uuid) -> String {
        format!("quiz:{quiz_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        count: u32,
    }

    #[test]
    fn test_set_get_delete() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let payload = Payload {
            name: "algebra".to_string(),
            count: 3,
        };

        cache.set("quiz:1", &payload);
        assert_eq!(cache.get::<Payload>("quiz:1"), Some(payload));
        assert!(cache.delete("quiz:1"));
        assert_eq!(cache.get::<Payload>("quiz:1"), None);
        assert!(!cache.delete("quiz:1"));
    }

    #[test]
    fn test_expired_entries_are_misses() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set_with_ttl("short", &1u32, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.get::<u32>("short"), None);
        assert!(cache.is_empty(), "Expired entry should be dropped on read");
    }

    #[test]
    fn test_zero_ttl_is_not_stored() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.set("k", &1u32);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("k", &"text");
        assert_eq!(cache.get::<Payload>("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_delete_prefix() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set(keys::public_quizzes(1), &1u32);
        cache.set(keys::public_quizzes(2), &2u32);
        cache.set(keys::public_flashcard_sets(1), &3u32);

        assert_eq!(cache.delete_prefix(keys::PUBLIC_QUIZZES_PREFIX), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<u32>(&keys::public_flashcard_sets(1)), Some(3));
    }

    #[test]
    fn test_purge_expired() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set_with_ttl("old", &1u32, Duration::from_millis(1));
        cache.set("fresh", &2u32);
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get::<u32>("fresh"), Some(2));
    }
}
