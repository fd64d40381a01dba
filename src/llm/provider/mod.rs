//! Provider implementations and factory
//!
//! Submodules implement specific providers. Ollama lives one level up as the
//! default local provider.

pub mod gemini;
pub mod openai;
pub mod scripted;

use std::sync::Arc;

use crate::core::config::{Config, ProviderKind};
use crate::core::{Answer, Result};
use crate::llm::traits::LlmProvider;
use crate::llm::OllamaClient;

use self::gemini::GeminiProvider;
use self::openai::OpenAiProvider;
use self::scripted::ScriptedProvider;

/// Create a provider based on configuration
pub fn create_provider(config: &Config) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider.kind {
        ProviderKind::Ollama => Arc::new(OllamaClient::from_config(config)?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_config(config)?),
        ProviderKind::Gemini => Arc::new(GeminiProvider::from_config(config)?),
        ProviderKind::Scripted => Arc::new(ScriptedProvider::repeating(Answer::text(
            "(scripted provider) no live reasoning provider is configured.",
        ))),
    };
    tracing::debug!(provider = provider.name(), model = %config.provider.model, "provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_honors_kind() {
        let mut config = Config::default();
        for (kind, name) in [
            (ProviderKind::Ollama, "ollama"),
            (ProviderKind::OpenAi, "openai"),
            (ProviderKind::Gemini, "gemini"),
            (ProviderKind::Scripted, "scripted"),
        ] {
            config.set_provider(kind);
            assert_eq!(create_provider(&config).unwrap().name(), name);
        }
    }
}
