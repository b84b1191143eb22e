//! Timestamped cache envelope over a [`LocalStore`].

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::LocalStore;

pub fn reference_ttl() -> TimeDelta {
    TimeDelta::hours(24)
}

pub fn ai_list_ttl() -> TimeDelta {
    TimeDelta::hours(6)
}

#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    timestamp: DateTime<Utc>,
    data: T,
}

/// Generic expiring cache. Structural-validity probes are deliberately *not*
/// built in; a call site with a legacy-shape signature reads the raw value,
/// probes it, and calls [`KeyedCache::invalidate`] itself.
#[derive(Clone)]
pub struct KeyedCache {
    store: Arc<dyn LocalStore>,
    ttl: TimeDelta,
}

impl KeyedCache {
    pub fn new(store: Arc<dyn LocalStore>, ttl: TimeDelta) -> Self {
        Self { store, ttl }
    }

    /// 24h cache for reference data.
    pub fn reference(store: Arc<dyn LocalStore>) -> Self {
        Self::new(store, reference_ttl())
    }

    /// 6h cache for AI-derived lists.
    pub fn ai_lists(store: Arc<dyn LocalStore>) -> Self {
        Self::new(store, ai_list_ttl())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    /// TTL check against an explicit clock. An unparsable envelope is treated
    /// as absent, never an error; an expired entry is removed.
    pub fn get_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let raw = self.store.get(key).ok().flatten()?;
        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(error) => {
                debug!(key, %error, "ignoring unparsable cache entry");
                return None;
            }
        };
        if now - entry.timestamp > self.ttl {
            debug!(key, "cache entry expired");
            self.invalidate(key);
            return None;
        }
        Some(entry.data)
    }

    /// Best-effort write; a storage failure is logged and swallowed.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        self.set_at(key, data, Utc::now());
    }

    pub fn set_at<T: Serialize>(&self, key: &str, data: &T, now: DateTime<Utc>) {
        let entry = CacheEntry {
            timestamp: now,
            data,
        };
        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(error) => {
                warn!(key, %error, "failed to serialize cache entry");
                return;
            }
        };
        if let Err(error) = self.store.set(key, &json) {
            warn!(key, %error, "failed to write cache entry, continuing without");
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Err(error) = self.store.remove(key) {
            warn!(key, %error, "failed to remove cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn cache() -> (Arc<MemoryStore>, KeyedCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = KeyedCache::reference(store.clone() as Arc<dyn LocalStore>);
        (store, cache)
    }

    #[test]
    fn returns_value_within_ttl() {
        let (_, cache) = cache();
        let t0 = Utc::now();
        cache.set_at("k", &42u32, t0);

        let hit: Option<u32> = cache.get_at("k", t0 + TimeDelta::hours(24));
        assert_eq!(hit, Some(42));
    }

    #[test]
    fn expires_just_past_ttl_and_removes_entry() {
        let (store, cache) = cache();
        let t0 = Utc::now();
        cache.set_at("k", &42u32, t0);

        let past = t0 + TimeDelta::hours(24) + TimeDelta::milliseconds(1);
        let miss: Option<u32> = cache.get_at("k", past);
        assert_eq!(miss, None);
        assert!(store.get("k").expect("get").is_none());
    }

    #[test]
    fn unparsable_envelope_is_a_miss_not_an_error() {
        let (store, cache) = cache();
        store.set("k", "definitely }{ not json").expect("set");
        let miss: Option<u32> = cache.get("k");
        assert_eq!(miss, None);
    }

    #[test]
    fn wrong_payload_type_is_a_miss() {
        let (_, cache) = cache();
        cache.set("k", &"a string");
        let miss: Option<u32> = cache.get("k");
        assert_eq!(miss, None);
    }

    #[test]
    fn invalidate_forces_a_miss() {
        let (_, cache) = cache();
        cache.set("k", &1u32);
        cache.invalidate("k");
        let miss: Option<u32> = cache.get("k");
        assert_eq!(miss, None);
    }

    #[test]
    fn ai_list_ttl_is_shorter_than_reference_ttl() {
        let store = Arc::new(MemoryStore::new()) as Arc<dyn LocalStore>;
        let ai = KeyedCache::ai_lists(store);
        let t0 = Utc::now();
        ai.set_at("k", &7u32, t0);

        let hit: Option<u32> = ai.get_at("k", t0 + TimeDelta::hours(6));
        assert_eq!(hit, Some(7));
        let miss: Option<u32> = ai.get_at("k", t0 + TimeDelta::hours(6) + TimeDelta::seconds(1));
        assert_eq!(miss, None);
    }
}
