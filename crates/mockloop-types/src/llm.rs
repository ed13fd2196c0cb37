//! Generation backend request/response types for Mockloop.
//!
//! These types model the data shapes exchanged with a generation backend:
//! completion requests, streaming events, usage tracking, provider
//! configuration, and error handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message in a backend conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a backend conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to a generation backend for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub stream: bool,
}

/// Response from a generation backend for a non-streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

/// Reason why the backend stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndTurn => write!(f, "end_turn"),
            StopReason::MaxTokens => write!(f, "max_tokens"),
        }
    }
}

/// Token usage for a completion request/response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Events emitted during a streaming backend response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A delta of generated text.
    TextDelta { text: String },

    /// The message is finishing with a stop reason.
    MessageDelta { stop_reason: StopReason },

    /// Token usage information.
    Usage(Usage),

    /// The stream has completed.
    Done,
}

/// Errors from generation backend operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("generation timed out after {0}s")]
    Timeout(u64),

    #[error("unknown provider: '{0}'")]
    UnknownProvider(String),
}

/// Type of generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    /// Replays canned responses; used for dry runs and tests.
    Scripted,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::OpenAiCompatible => write!(f, "openai_compatible"),
            ProviderType::Scripted => write!(f, "scripted"),
        }
    }
}

/// Configuration for a single named generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Registry name requested by callers (e.g., "deepseek", "hunyuan").
    pub name: String,
    /// Backend type for this provider.
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// Override the default base URL for the provider.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model identifier to use.
    pub model: String,
    /// Environment variable holding the API key. `None` for keyless backends.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

impl ProviderConfig {
    fn preset(name: &str, base_url: &str, model: &str, api_key_env: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            provider_type: ProviderType::OpenAiCompatible,
            base_url: Some(base_url.to_string()),
            model: model.to_string(),
            api_key_env: api_key_env.map(str::to_string),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Built-in provider presets used when `config.toml` declares none.
    pub fn presets() -> Vec<ProviderConfig> {
        vec![
            Self::preset(
                "deepseek",
                "https://api.deepseek.com/v1",
                "deepseek-chat",
                Some("DEEPSEEK_API_KEY"),
            ),
            Self::preset(
                "hunyuan",
                "https://api.hunyuan.cloud.tencent.com/v1",
                "hunyuan-lite",
                Some("HUNYUAN_API_KEY"),
            ),
            Self::preset(
                "openai",
                "https://api.openai.com/v1",
                "gpt-4o-mini",
                Some("OPENAI_API_KEY"),
            ),
            Self::preset("ollama", "http://localhost:11434/v1", "llama3.1", None),
            Self {
                name: "scripted".to_string(),
                provider_type: ProviderType::Scripted,
                base_url: None,
                model: "scripted".to_string(),
                api_key_env: None,
                temperature: 0.0,
                max_tokens: default_max_tokens(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_serde_matches_display() {
        for role in [MessageRole::System, MessageRole::User, MessageRole::Assistant] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
            let parsed: MessageRole = serde_json::from_str(&json).unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_stop_reason_serde() {
        let reason = StopReason::EndTurn;
        let json = serde_json::to_string(&reason).unwrap();
        assert_eq!(json, "\"end_turn\"");
        let parsed: StopReason = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, StopReason::EndTurn);
    }

    #[test]
    fn test_llm_error_display() {
        assert_eq!(LlmError::Timeout(60).to_string(), "generation timed out after 60s");
        assert_eq!(
            LlmError::UnknownProvider("gemini".to_string()).to_string(),
            "unknown provider: 'gemini'"
        );
    }

    #[test]
    fn test_provider_type_serde() {
        let json = serde_json::to_string(&ProviderType::OpenAiCompatible).unwrap();
        assert_eq!(json, "\"openai_compatible\"");
        let parsed: ProviderType = serde_json::from_str("\"scripted\"").unwrap();
        assert_eq!(parsed, ProviderType::Scripted);
    }

    #[test]
    fn test_presets_cover_known_backends() {
        let presets = ProviderConfig::presets();
        let deepseek = presets.iter().find(|p| p.name == "deepseek").unwrap();
        assert_eq!(deepseek.model, "deepseek-chat");
        assert_eq!(deepseek.base_url.as_deref(), Some("https://api.deepseek.com/v1"));

        let hunyuan = presets.iter().find(|p| p.name == "hunyuan").unwrap();
        assert_eq!(hunyuan.model, "hunyuan-lite");

        let ollama = presets.iter().find(|p| p.name == "ollama").unwrap();
        assert!(ollama.api_key_env.is_none());
    }

    #[test]
    fn test_stream_event_tagging() {
        let event = StreamEvent::TextDelta {
            text: "hi".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "text_delta");
        assert_eq!(json["text"], "hi");
    }
}
