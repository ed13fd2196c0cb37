//! SQLite-backed TTL session cache.
//!
//! Implements `SessionCache` from `mockloop-core` on two tables in the same
//! database as the record store: `session_cache` for scalar keys and
//! `session_cache_sets` for set members. Expiry is stored as epoch
//! milliseconds computed from the injected clock; expired rows read as
//! absent and are swept by [`SqliteSessionCache::purge_expired`].

use std::sync::Arc;
use std::time::Duration;

use sqlx::Row;

use mockloop_core::cache::SessionCache;
use mockloop_core::clock::Clock;
use mockloop_types::error::CacheError;

use super::pool::DatabasePool;

/// Session cache stored in SQLite. Survives process restarts.
pub struct SqliteSessionCache {
    pool: DatabasePool,
    clock: Arc<dyn Clock>,
}

impl SqliteSessionCache {
    pub fn new(pool: DatabasePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn expiry_millis(&self, ttl: Duration) -> Result<i64, CacheError> {
        let ttl = i64::try_from(ttl.as_millis())
            .map_err(|_| CacheError::Backend(format!("ttl out of range: {ttl:?}")))?;
        Ok(self.now_millis().saturating_add(ttl))
    }

    /// Delete every expired row. Returns how many rows were removed.
    pub async fn purge_expired(&self) -> Result<u64, CacheError> {
        let now = self.now_millis();
        let values = sqlx::query("DELETE FROM session_cache WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool.writer)
            .await
            .map_err(backend)?;
        let members = sqlx::query("DELETE FROM session_cache_sets WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool.writer)
            .await
            .map_err(backend)?;
        Ok(values.rows_affected() + members.rows_affected())
    }
}

fn backend(e: sqlx::Error) -> CacheError {
    CacheError::Backend(e.to_string())
}

impl SessionCache for SqliteSessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let row = sqlx::query("SELECT value FROM session_cache WHERE key = ? AND expires_at > ?")
            .bind(key)
            .bind(self.now_millis())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(backend)?;

        row.map(|row| row.try_get("value"))
            .transpose()
            .map_err(backend)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        sqlx::query(
            r#"INSERT INTO session_cache (key, value, expires_at) VALUES (?, ?, ?)
               ON CONFLICT (key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(self.expiry_millis(ttl)?)
        .execute(&self.pool.writer)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = self.now_millis();
        let expires_at = self.expiry_millis(ttl)?;
        let mut tx = self.pool.writer.begin().await.map_err(backend)?;

        // An expired set starts over rather than reviving its old members.
        sqlx::query("DELETE FROM session_cache_sets WHERE key = ? AND expires_at <= ?")
            .bind(key)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        sqlx::query(
            r#"INSERT INTO session_cache_sets (key, member, expires_at) VALUES (?, ?, ?)
               ON CONFLICT (key, member) DO NOTHING"#,
        )
        .bind(key)
        .bind(member)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query("UPDATE session_cache_sets SET expires_at = ? WHERE key = ?")
            .bind(expires_at)
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let rows = sqlx::query(
            "SELECT member FROM session_cache_sets WHERE key = ? AND expires_at > ? ORDER BY member",
        )
        .bind(key)
        .bind(self.now_millis())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(backend)?;

        let mut members = Vec::with_capacity(rows.len());
        for row in &rows {
            members.push(row.try_get("member").map_err(backend)?);
        }
        Ok(members)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut tx = self.pool.writer.begin().await.map_err(backend)?;
        sqlx::query("DELETE FROM session_cache WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query("DELETE FROM session_cache_sets WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockloop_core::clock::ManualClock;

    async fn test_cache() -> (Arc<ManualClock>, SqliteSessionCache) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("cache.db").display());
        std::mem::forget(dir);
        let pool = DatabasePool::new(&url).await.unwrap();
        let clock = Arc::new(ManualClock::default());
        (clock.clone(), SqliteSessionCache::new(pool, clock))
    }

    #[tokio::test]
    async fn test_set_overwrites_value_and_ttl() {
        let (clock, cache) = test_cache().await;
        cache
            .set("interview:1:metadata", "{\"v\":1}", Duration::from_secs(10))
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(8));
        cache
            .set("interview:1:metadata", "{\"v\":2}", Duration::from_secs(10))
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(8));

        assert_eq!(
            cache.get("interview:1:metadata").await.unwrap().as_deref(),
            Some("{\"v\":2}")
        );
    }

    #[tokio::test]
    async fn test_expired_value_reads_absent() {
        let (clock, cache) = test_cache().await;
        cache
            .set("interview:1:history", "[]", Duration::from_secs(60))
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(61));

        assert!(cache.get("interview:1:history").await.unwrap().is_none());
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_membership_refreshes_ttl() {
        let (clock, cache) = test_cache().await;
        let ttl = Duration::from_secs(100);
        cache.add_to_set("user:1:interviews", "4", ttl).await.unwrap();
        clock.advance(chrono::Duration::seconds(90));
        cache.add_to_set("user:1:interviews", "9", ttl).await.unwrap();
        cache.add_to_set("user:1:interviews", "4", ttl).await.unwrap();
        clock.advance(chrono::Duration::seconds(90));

        assert_eq!(
            cache.set_members("user:1:interviews").await.unwrap(),
            vec!["4".to_string(), "9".to_string()]
        );

        clock.advance(chrono::Duration::seconds(11));
        assert!(cache.set_members("user:1:interviews").await.unwrap().is_empty());

        cache.add_to_set("user:1:interviews", "12", ttl).await.unwrap();
        assert_eq!(
            cache.set_members("user:1:interviews").await.unwrap(),
            vec!["12".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_removes_key() {
        let (_, cache) = test_cache().await;
        cache
            .set("interview:3:history", "[]", Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("interview:3:history").await.unwrap();
        assert!(cache.get("interview:3:history").await.unwrap().is_none());
    }
}
