//! In-process working history.
//!
//! Maps a session id to the ordered messages used to build prompts. The map
//! is the hot path of every turn; it is lost on restart and rebuilt through
//! the recovery protocol.

use std::sync::Arc;

use dashmap::DashMap;

use mockloop_types::session::HistoryMessage;

/// Shared session id -> working history map.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    sessions: Arc<DashMap<String, Vec<HistoryMessage>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the working history for `session_id`, if loaded.
    pub fn get(&self, session_id: &str) -> Option<Vec<HistoryMessage>> {
        self.sessions.get(session_id).map(|h| h.clone())
    }

    pub fn put(&self, session_id: &str, messages: Vec<HistoryMessage>) {
        self.sessions.insert(session_id.to_string(), messages);
    }

    /// Drop one session's working history, forcing recovery on its next turn.
    pub fn evict(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }
}
