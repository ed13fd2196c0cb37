//! Generation backend implementations and registry wiring.
//!
//! [`create_provider`] constructs the right provider from a
//! [`ProviderConfig`]; [`build_registry`] registers one constructor per
//! configured provider so the engine can look providers up by name.

pub mod openai_compat;

use secrecy::SecretString;

use mockloop_core::llm::box_provider::BoxLlmProvider;
use mockloop_core::llm::registry::ProviderRegistry;
use mockloop_core::llm::scripted::ScriptedProvider;
use mockloop_types::config::EngineConfig;
use mockloop_types::llm::{LlmError, ProviderConfig, ProviderType};

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Read the API key named by `api_key_env`, if the provider needs one.
///
/// Returns `AuthenticationFailed` when the variable is unset or empty.
pub fn resolve_api_key(config: &ProviderConfig) -> Result<Option<SecretString>, LlmError> {
    let Some(var) = config.api_key_env.as_deref() else {
        return Ok(None);
    };
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(Some(SecretString::from(key))),
        _ => {
            tracing::debug!(provider = %config.name, env = %var, "API key not set");
            Err(LlmError::AuthenticationFailed)
        }
    }
}

/// Create a [`BoxLlmProvider`] from a [`ProviderConfig`].
pub fn create_provider(config: &ProviderConfig) -> Result<BoxLlmProvider, LlmError> {
    match config.provider_type {
        ProviderType::OpenAiCompatible => {
            let api_key = resolve_api_key(config)?;
            let provider =
                OpenAiCompatibleProvider::new(OpenAiCompatConfig::from_provider(config, api_key));
            Ok(BoxLlmProvider::new(provider))
        }
        ProviderType::Scripted => Ok(BoxLlmProvider::new(ScriptedProvider::new(
            config.name.clone(),
        ))),
    }
}

/// Register every effective provider of `config`. Construction is deferred
/// to first use (or to [`ProviderRegistry::validate`]).
pub fn build_registry(config: &EngineConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for provider in config.effective_providers() {
        let name = provider.name.clone();
        registry.register(name, Box::new(move || create_provider(&provider)));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted(name: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            provider_type: ProviderType::Scripted,
            base_url: None,
            model: "scripted".to_string(),
            api_key_env: None,
            temperature: 0.0,
            max_tokens: 512,
        }
    }

    #[test]
    fn test_scripted_provider_needs_no_key() {
        let provider = create_provider(&scripted("dry")).unwrap();
        assert_eq!(provider.name(), "dry");
    }

    #[test]
    fn test_missing_key_fails_authentication() {
        let mut config = ProviderConfig::presets()
            .into_iter()
            .find(|p| p.name == "deepseek")
            .unwrap();
        config.api_key_env = Some("MOCKLOOP_TEST_KEY_THAT_IS_NEVER_SET".to_string());
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, LlmError::AuthenticationFailed));
    }

    #[test]
    fn test_keyless_openai_compatible_provider() {
        let ollama = ProviderConfig::presets()
            .into_iter()
            .find(|p| p.name == "ollama")
            .unwrap();
        let provider = create_provider(&ollama).unwrap();
        assert_eq!(provider.model(), "llama3.1");
    }

    #[test]
    fn test_registry_uses_presets_by_default() {
        let registry = build_registry(&EngineConfig::default());
        assert_eq!(
            registry.list_names(),
            vec!["deepseek", "hunyuan", "ollama", "openai", "scripted"]
        );
        assert!(registry.get("scripted").is_ok());
        assert!(matches!(
            registry.get("gemini").err().unwrap(),
            LlmError::UnknownProvider(_)
        ));
    }

    #[test]
    fn test_registry_from_configured_providers() {
        let config = EngineConfig {
            providers: vec![scripted("dry"), scripted("wet")],
            default_provider: "dry".to_string(),
            ..EngineConfig::default()
        };
        let registry = build_registry(&config);
        assert_eq!(registry.list_names(), vec!["dry", "wet"]);
        registry.validate(&["dry"]).unwrap();
        assert_eq!(registry.get("wet").unwrap().name(), "wet");
    }
}
