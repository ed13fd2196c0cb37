//! Working-history and session-cache projection types.
//!
//! The session cache is a rebuildable projection of the in-process working
//! history plus a small metadata record. It is never the system of record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interview::Stage;
use crate::llm::MessageRole;

/// One message of the working history, as serialized into the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryMessage {
    pub fn interviewer(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp,
        }
    }

    pub fn candidate(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp,
        }
    }
}

/// Cached metadata for a session, written under `interview:{id}:metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub position: String,
    pub user_id: i64,
    pub provider: String,
    pub current_stage: Stage,
    pub question_count: u32,
    pub last_updated: DateTime<Utc>,
}

/// A point-in-time copy of a session handed to the cache refresher.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub interview_id: i64,
    pub user_id: i64,
    pub messages: Vec<HistoryMessage>,
    pub metadata: SessionMetadata,
}
