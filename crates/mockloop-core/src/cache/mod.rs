//! Session cache port.
//!
//! The session cache is a fast, TTL-based key-value store holding the
//! serialized working history and session metadata of each interview, plus a
//! per-user index of cached interviews. It is a resumability optimization,
//! never the system of record.

pub mod memory;

use std::time::Duration;

use mockloop_types::error::CacheError;

/// Key under which an interview's working history is cached.
pub fn history_key(interview_id: i64) -> String {
    format!("interview:{interview_id}:history")
}

/// Key under which an interview's session metadata is cached.
pub fn metadata_key(interview_id: i64) -> String {
    format!("interview:{interview_id}:metadata")
}

/// Key of the set of cached interview ids for a user.
pub fn user_index_key(user_id: i64) -> String {
    format!("user:{user_id}:interviews")
}

/// TTL key-value store backing session recovery.
///
/// Implementations: `MemorySessionCache` (in-process, here) and
/// `SqliteSessionCache` (mockloop-infra). Expired entries must read as absent.
pub trait SessionCache: Send + Sync {
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, CacheError>> + Send;

    /// Store `value` under `key`, replacing any previous value and TTL.
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;

    /// Add `member` to the set at `key` and refresh the set's TTL.
    fn add_to_set(
        &self,
        key: &str,
        member: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;

    /// Members of the set at `key`; empty when absent or expired.
    fn set_members(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, CacheError>> + Send;

    fn delete(&self, key: &str)
    -> impl std::future::Future<Output = Result<(), CacheError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(history_key(12), "interview:12:history");
        assert_eq!(metadata_key(12), "interview:12:metadata");
        assert_eq!(user_index_key(3), "user:3:interviews");
    }
}
