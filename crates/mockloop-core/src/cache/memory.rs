//! In-process session cache.
//!
//! A `DashMap`-backed TTL store. Expiry is evaluated lazily against the
//! injected [`Clock`], so a `ManualClock` can expire entries in tests
//! without sleeping.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use mockloop_types::error::CacheError;

use super::SessionCache;
use crate::clock::Clock;

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

/// TTL cache held in process memory. Lost on restart.
pub struct MemorySessionCache {
    values: DashMap<String, Entry<String>>,
    sets: DashMap<String, Entry<BTreeSet<String>>>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            values: DashMap::new(),
            sets: DashMap::new(),
            clock,
        }
    }

    fn expiry(&self, ttl: Duration) -> Result<DateTime<Utc>, CacheError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CacheError::Backend(format!("invalid ttl: {e}")))?;
        Ok(self.clock.now() + ttl)
    }

    /// Number of live (unexpired) scalar keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.values.iter().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionCache for MemorySessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        let expired = match self.values.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.values.remove_if(key, |_, e| e.expires_at <= now);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = self.expiry(ttl)?;
        self.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = self.expiry(ttl)?;
        let now = self.clock.now();
        let mut entry = self.sets.entry(key.to_string()).or_insert_with(|| Entry {
            value: BTreeSet::new(),
            expires_at,
        });
        if entry.expires_at <= now {
            entry.value.clear();
        }
        entry.value.insert(member.to_string());
        entry.expires_at = expires_at;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let now = self.clock.now();
        Ok(match self.sets.get(key) {
            Some(entry) if entry.expires_at > now => entry.value.iter().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.values.remove(key);
        self.sets.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache() -> (Arc<ManualClock>, MemorySessionCache) {
        let clock = Arc::new(ManualClock::default());
        let cache = MemorySessionCache::new(clock.clone());
        (clock, cache)
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (_, cache) = cache();
        cache
            .set("interview:1:history", "[]", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("interview:1:history").await.unwrap().as_deref(),
            Some("[]")
        );
        assert!(cache.get("interview:2:history").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_with_clock() {
        let (clock, cache) = cache();
        cache.set("k", "v", Duration::from_secs(86_400)).await.unwrap();

        clock.advance(chrono::Duration::hours(23));
        assert!(cache.get("k").await.unwrap().is_some());

        clock.advance(chrono::Duration::hours(2));
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_set_members_refresh_ttl() {
        let (clock, cache) = cache();
        let week = Duration::from_secs(604_800);
        cache.add_to_set("user:1:interviews", "7", week).await.unwrap();

        clock.advance(chrono::Duration::days(6));
        cache.add_to_set("user:1:interviews", "9", week).await.unwrap();

        clock.advance(chrono::Duration::days(3));
        let members = cache.set_members("user:1:interviews").await.unwrap();
        assert_eq!(members, vec!["7".to_string(), "9".to_string()]);

        clock.advance(chrono::Duration::days(5));
        assert!(cache.set_members("user:1:interviews").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_both_kinds() {
        let (_, cache) = cache();
        let ttl = Duration::from_secs(60);
        cache.set("a", "1", ttl).await.unwrap();
        cache.add_to_set("a", "x", ttl).await.unwrap();

        cache.delete("a").await.unwrap();
        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.set_members("a").await.unwrap().is_empty());
    }
}
