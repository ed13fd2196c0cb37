//! Session persistence and recovery protocol.
//!
//! Write path: after every commit, the working history and session metadata
//! are written under `interview:{id}:history` / `interview:{id}:metadata`
//! and the interview id is added to `user:{id}:interviews`.
//!
//! Read path: when a session's working history is not loaded, the metadata
//! key decides. Present means the cached history is reloaded; absent means a
//! fresh history seeded from the durable interview row. Recovery never
//! touches the record store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use mockloop_types::error::CacheError;
use mockloop_types::interview::Interview;
use mockloop_types::session::{HistoryMessage, SessionMetadata, SessionSnapshot};

use super::prompt::seed_history;
use crate::cache::{SessionCache, history_key, metadata_key, user_index_key};

/// Where a recovered working history came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySource {
    Cache,
    /// Cache miss; rebuilt from the interview row only.
    Seeded,
}

#[derive(Debug, Clone)]
pub struct Recovered {
    pub messages: Vec<HistoryMessage>,
    pub source: RecoverySource,
}

fn seeded(interview: &Interview, now: DateTime<Utc>) -> Recovered {
    Recovered {
        messages: seed_history(&interview.resume, now),
        source: RecoverySource::Seeded,
    }
}

/// Rebuild the working history of `interview`. Never fails.
pub async fn recover<C: SessionCache>(
    cache: &C,
    interview: &Interview,
    now: DateTime<Utc>,
) -> Recovered {
    match read_cached(cache, interview.id).await {
        Ok(Some(messages)) => {
            debug!(
                interview_id = interview.id,
                messages = messages.len(),
                "recovered working history from session cache"
            );
            Recovered {
                messages,
                source: RecoverySource::Cache,
            }
        }
        Ok(None) => {
            info!(
                interview_id = interview.id,
                "session cache miss; continuing with a fresh history"
            );
            seeded(interview, now)
        }
        Err(e) => {
            warn!(
                interview_id = interview.id,
                error = %e,
                "session cache read failed; continuing with a fresh history"
            );
            seeded(interview, now)
        }
    }
}

async fn read_cached<C: SessionCache>(
    cache: &C,
    interview_id: i64,
) -> Result<Option<Vec<HistoryMessage>>, CacheError> {
    let Some(metadata) = cache.get(&metadata_key(interview_id)).await? else {
        return Ok(None);
    };
    // A corrupt metadata entry invalidates the whole session.
    serde_json::from_str::<SessionMetadata>(&metadata)?;
    let Some(history) = cache.get(&history_key(interview_id)).await? else {
        return Ok(None);
    };
    let messages: Vec<HistoryMessage> = serde_json::from_str(&history)?;
    Ok(Some(messages))
}

/// Write one snapshot to the cache.
pub async fn persist_snapshot<C: SessionCache>(
    cache: &C,
    snapshot: &SessionSnapshot,
    history_ttl: Duration,
    user_index_ttl: Duration,
) -> Result<(), CacheError> {
    let history = serde_json::to_string(&snapshot.messages)?;
    let metadata = serde_json::to_string(&snapshot.metadata)?;

    cache
        .set(&history_key(snapshot.interview_id), &history, history_ttl)
        .await?;
    cache
        .set(&metadata_key(snapshot.interview_id), &metadata, history_ttl)
        .await?;
    cache
        .add_to_set(
            &user_index_key(snapshot.user_id),
            &snapshot.interview_id.to_string(),
            user_index_ttl,
        )
        .await?;
    Ok(())
}

/// Drop an ended interview's history and metadata.
///
/// The user index keeps the id until its own TTL runs out.
pub async fn discard_session<C: SessionCache>(
    cache: &C,
    interview_id: i64,
) -> Result<(), CacheError> {
    cache.delete(&history_key(interview_id)).await?;
    cache.delete(&metadata_key(interview_id)).await
}
