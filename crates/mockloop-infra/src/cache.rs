//! Session cache backend selection.
//!
//! `InterviewService` is generic over one cache type, so the backend chosen
//! in `config.toml` is wrapped in [`AnySessionCache`] and dispatched here.

use std::sync::Arc;
use std::time::Duration;

use mockloop_core::cache::SessionCache;
use mockloop_core::cache::memory::MemorySessionCache;
use mockloop_core::clock::Clock;
use mockloop_types::config::CacheBackend;
use mockloop_types::error::CacheError;

use crate::sqlite::pool::DatabasePool;
use crate::sqlite::session_cache::SqliteSessionCache;

/// The configured session cache.
pub enum AnySessionCache {
    Sqlite(SqliteSessionCache),
    Memory(MemorySessionCache),
}

impl AnySessionCache {
    pub fn backend(&self) -> CacheBackend {
        match self {
            AnySessionCache::Sqlite(_) => CacheBackend::Sqlite,
            AnySessionCache::Memory(_) => CacheBackend::Memory,
        }
    }
}

/// Open the cache for `backend`.
///
/// The SQLite cache is swept of expired rows on open; a failed sweep is
/// logged and ignored since expired rows already read as absent.
pub async fn open_session_cache(
    backend: CacheBackend,
    pool: &DatabasePool,
    clock: Arc<dyn Clock>,
) -> AnySessionCache {
    match backend {
        CacheBackend::Sqlite => {
            let cache = SqliteSessionCache::new(pool.clone(), clock);
            match cache.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "purged expired session cache rows"),
                Err(e) => tracing::warn!(error = %e, "session cache purge failed"),
            }
            AnySessionCache::Sqlite(cache)
        }
        CacheBackend::Memory => AnySessionCache::Memory(MemorySessionCache::new(clock)),
    }
}

impl SessionCache for AnySessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self {
            AnySessionCache::Sqlite(cache) => cache.get(key).await,
            AnySessionCache::Memory(cache) => cache.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        match self {
            AnySessionCache::Sqlite(cache) => cache.set(key, value, ttl).await,
            AnySessionCache::Memory(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError> {
        match self {
            AnySessionCache::Sqlite(cache) => cache.add_to_set(key, member, ttl).await,
            AnySessionCache::Memory(cache) => cache.add_to_set(key, member, ttl).await,
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        match self {
            AnySessionCache::Sqlite(cache) => cache.set_members(key).await,
            AnySessionCache::Memory(cache) => cache.set_members(key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            AnySessionCache::Sqlite(cache) => cache.delete(key).await,
            AnySessionCache::Memory(cache) => cache.delete(key).await,
        }
    }
}
