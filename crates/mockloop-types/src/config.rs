//! Engine configuration types for Mockloop.
//!
//! `EngineConfig` represents the top-level `config.toml` that controls the
//! question cap, cache lifetimes, backend timeouts, and the provider table.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderConfig;

/// Which session cache backend to run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// TTL tables in the same SQLite database; survives restarts.
    #[default]
    Sqlite,
    /// In-process map; lost on restart.
    Memory,
}

/// Top-level configuration for the interview engine.
///
/// Loaded from `~/.mockloop/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of questions per interview.
    #[serde(default = "default_question_cap")]
    pub question_cap: u32,

    /// Maximum consecutive questions on one topic.
    #[serde(default = "default_topic_repeat_limit")]
    pub topic_repeat_limit: u32,

    /// TTL of the history and metadata cache keys.
    #[serde(default = "default_history_ttl_secs")]
    pub history_ttl_secs: u64,

    /// TTL of the per-user interview index set.
    #[serde(default = "default_user_index_ttl_secs")]
    pub user_index_ttl_secs: u64,

    /// Upper bound on every generation backend call.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Neutral score used when the scoring output cannot be parsed.
    #[serde(default = "default_fallback_score")]
    pub fallback_score: i32,

    /// Attempts per post-commit cache refresh.
    #[serde(default = "default_cache_refresh_attempts")]
    pub cache_refresh_attempts: u32,

    /// Provider used when a start request names none.
    #[serde(default = "default_provider")]
    pub default_provider: String,

    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Named generation backends. Falls back to the built-in presets when empty.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

fn default_question_cap() -> u32 {
    15
}

fn default_topic_repeat_limit() -> u32 {
    3
}

fn default_history_ttl_secs() -> u64 {
    86_400
}

fn default_user_index_ttl_secs() -> u64 {
    604_800
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_fallback_score() -> i32 {
    75
}

fn default_cache_refresh_attempts() -> u32 {
    3
}

fn default_provider() -> String {
    "deepseek".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            question_cap: default_question_cap(),
            topic_repeat_limit: default_topic_repeat_limit(),
            history_ttl_secs: default_history_ttl_secs(),
            user_index_ttl_secs: default_user_index_ttl_secs(),
            generation_timeout_secs: default_generation_timeout_secs(),
            fallback_score: default_fallback_score(),
            cache_refresh_attempts: default_cache_refresh_attempts(),
            default_provider: default_provider(),
            cache_backend: CacheBackend::default(),
            providers: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Configured providers, or the built-in presets when none are declared.
    pub fn effective_providers(&self) -> Vec<ProviderConfig> {
        if self.providers.is_empty() {
            ProviderConfig::presets()
        } else {
            self.providers.clone()
        }
    }
}
