//! Connection settings for OpenAI-compatible backends.

use secrecy::SecretString;

use mockloop_types::llm::ProviderConfig;

/// Default base URL when a provider config names none.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for an OpenAI-compatible generation backend.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Registry name (e.g., "deepseek", "hunyuan").
    pub provider_name: String,
    pub base_url: String,
    /// `None` for keyless local servers such as Ollama.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub max_tokens: u32,
    /// Applied when a request carries no temperature of its own.
    pub temperature: Option<f64>,
}

impl OpenAiCompatConfig {
    /// Build from a provider table entry and its resolved key.
    pub fn from_provider(config: &ProviderConfig, api_key: Option<SecretString>) -> Self {
        Self {
            provider_name: config.name.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: Some(config.temperature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_preset() {
        let presets = ProviderConfig::presets();
        let hunyuan = presets.iter().find(|p| p.name == "hunyuan").unwrap();
        let config = OpenAiCompatConfig::from_provider(hunyuan, None);
        assert_eq!(config.provider_name, "hunyuan");
        assert_eq!(config.base_url, "https://api.hunyuan.cloud.tencent.com/v1");
        assert_eq!(config.model, "hunyuan-lite");
        assert_eq!(config.temperature, Some(0.7));
    }

    #[test]
    fn test_missing_base_url_defaults_to_openai() {
        let mut provider = ProviderConfig::presets()
            .into_iter()
            .find(|p| p.name == "openai")
            .unwrap();
        provider.base_url = None;
        let config = OpenAiCompatConfig::from_provider(&provider, None);
        assert_eq!(config.base_url, OPENAI_BASE_URL);
    }
}
