// Batch translation of caption texts
//
// The batch translator talks to a hosted model through the TranslationService
// trait; concrete backends live in their own modules:
// - anthropic: Anthropic messages API
// - ollama: local Ollama generate API

pub mod anthropic;
pub mod batch;
pub mod ollama;

#[cfg(test)]
mod test_server;

use async_trait::async_trait;
use std::time::Duration;

pub use batch::BatchTranslator;
use crate::config::{TranslateConfig, TranslationProvider};
use crate::error::{CapfetchError, Result};

/// Token placed between caption texts inside one request
pub const SEPARATOR_TOKEN: &str = "---SEPARATOR---";

/// One outbound translation call
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    /// Caption texts joined by the separator token
    pub text: String,
    /// Human-readable target language
    pub target_language: String,
    /// Number of caption texts contained in `text`
    pub item_count: usize,
    /// Output size limit for this call
    pub max_tokens: u32,
    /// Time limit for this call
    pub timeout: Duration,
}

/// A hosted service that turns one separator-joined blob into another
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Translate a batch and return the raw response text
    async fn translate_batch(&self, request: &BatchRequest) -> Result<String>;
}

/// Instruction text shared by every backend
pub fn build_prompt(request: &BatchRequest) -> String {
    format!(
        "Please translate the following subtitle text from English to {language}.\n\
         \n\
         IMPORTANT INSTRUCTIONS:\n\
         1. Translate each subtitle entry separately\n\
         2. Maintain the same number of entries as the input ({count})\n\
         3. Preserve the meaning and context\n\
         4. Keep translations natural and readable\n\
         5. Separate each translation with {separator}\n\
         6. Do not add explanations or extra text\n\
         \n\
         Subtitle text to translate:\n\
         {text}",
        language = request.target_language,
        count = request.item_count,
        separator = SEPARATOR_TOKEN,
        text = request.text,
    )
}

/// Factory for creating translation service instances
pub struct TranslationServiceFactory;

impl TranslationServiceFactory {
    /// Create the backend selected in the configuration
    pub fn create_service(config: &TranslateConfig) -> Result<Box<dyn TranslationService>> {
        match config.provider {
            TranslationProvider::Anthropic => {
                let api_key = config
                    .api_key
                    .clone()
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| CapfetchError::Config("No API key configured for Anthropic".to_string()))?;
                Ok(Box::new(anthropic::AnthropicService::new(
                    api_key,
                    &config.endpoint,
                    &config.model,
                )?))
            }
            TranslationProvider::Ollama => {
                Ok(Box::new(ollama::OllamaService::new(&config.endpoint, &config.model)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_prompt_mentions_language_count_and_separator() {
        let request = BatchRequest {
            text: "Hello\n---SEPARATOR---\nWorld".to_string(),
            target_language: "Vietnamese".to_string(),
            item_count: 2,
            max_tokens: 100,
            timeout: Duration::from_secs(5),
        };

        let prompt = build_prompt(&request);
        assert!(prompt.contains("from English to Vietnamese"));
        assert!(prompt.contains("input (2)"));
        assert!(prompt.contains("Separate each translation with ---SEPARATOR---"));
        assert!(prompt.ends_with("Hello\n---SEPARATOR---\nWorld"));
    }

    #[test]
    fn test_factory_requires_key_for_anthropic() {
        let mut config = Config::default().translate;
        assert!(matches!(
            TranslationServiceFactory::create_service(&config),
            Err(CapfetchError::Config(_))
        ));

        config.api_key = Some("key".to_string());
        assert!(TranslationServiceFactory::create_service(&config).is_ok());

        config.api_key = None;
        config.provider = TranslationProvider::Ollama;
        assert!(TranslationServiceFactory::create_service(&config).is_ok());
    }
}
