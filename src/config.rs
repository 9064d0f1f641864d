use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{CapfetchError, Result};

/// Environment variable consulted when no API key is present in the config file
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

// Default values for fields that older config files may not carry
fn default_enabled() -> bool {
    true
}

fn default_rate_limit_delay_ms() -> u64 {
    500
}

fn default_artifact_phrases() -> Vec<String> {
    [
        "sau đây",
        "bản dịch",
        "phụ đề",
        "vietnamese translation",
        "here's the vietnamese",
        "here are the vietnamese",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub fetch: FetchConfig,
    pub translate: TranslateConfig,
    pub clean: CleanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Path to the yt-dlp binary
    pub binary_path: String,
    /// Directory that receives one sub-folder per fetched video
    pub output_dir: String,
    /// Caption languages requested from the site
    pub subtitle_languages: Vec<String>,
    /// Caption file format requested from the site
    pub subtitle_format: String,
    /// yt-dlp format selector for the media itself
    pub video_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Translate fetched captions when no target-language file exists
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Hosted service used for batch translation
    pub provider: TranslationProvider,
    /// Base URL of the service; empty means the provider's public endpoint
    pub endpoint: String,
    /// Model name passed to the service
    pub model: String,
    /// Service credential. Never written back to disk.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Human-readable target language, e.g. "Vietnamese"
    pub target_language: String,
    /// Number of caption texts per request
    pub batch_size: usize,
    /// Pause between two consecutive requests
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    /// Upper bound on output tokens per request
    pub max_tokens: u32,
    /// Per-request timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationProvider {
    /// Anthropic messages API
    Anthropic,
    /// Local Ollama server
    Ollama,
}

impl TranslationProvider {
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Anthropic)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanConfig {
    /// Drop caption lines containing translation boilerplate
    pub remove_artifacts: bool,
    /// Strip inline markup such as <c> and <00:00:01.000>
    pub remove_markup: bool,
    /// Phrases (matched case-insensitively) that mark a line as boilerplate
    #[serde(default = "default_artifact_phrases")]
    pub artifact_phrases: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig {
                binary_path: "yt-dlp".to_string(),
                output_dir: "download-data".to_string(),
                subtitle_languages: vec!["en".to_string(), "en-US".to_string()],
                subtitle_format: "vtt".to_string(),
                video_format: "best".to_string(),
            },
            translate: TranslateConfig {
                enabled: true,
                provider: TranslationProvider::Anthropic,
                endpoint: String::new(),
                model: "claude-3-haiku-20240307".to_string(),
                api_key: None,
                target_language: "Vietnamese".to_string(),
                batch_size: 50,
                rate_limit_delay_ms: 500,
                max_tokens: 8000,
                timeout_secs: 60,
            },
            clean: CleanConfig {
                remove_artifacts: true,
                remove_markup: true,
                artifact_phrases: default_artifact_phrases(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CapfetchError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CapfetchError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| CapfetchError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Fill the API key from the environment when the file did not provide one
    pub fn apply_env(&mut self) {
        if self.translate.api_key.as_deref().map_or(true, str::is_empty) {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                if !key.trim().is_empty() {
                    self.translate.api_key = Some(key.trim().to_string());
                }
            }
        }
    }
}

impl TranslateConfig {
    /// True when translation may run: enabled, and credentials present if the provider needs them
    pub fn is_ready(&self) -> bool {
        if !self.enabled {
            return false;
        }
        if self.provider.requires_api_key() {
            return self.api_key.as_deref().is_some_and(|k| !k.is_empty());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trip_through_toml() {
        let mut config = Config::default();
        config.translate.api_key = Some("secret".to_string());

        let text = toml::to_string_pretty(&config).unwrap();
        assert!(!text.contains("secret"));

        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.translate.batch_size, 50);
        assert_eq!(parsed.translate.target_language, "Vietnamese");
        assert_eq!(parsed.translate.provider, TranslationProvider::Anthropic);
        assert!(parsed.translate.api_key.is_none());
        assert_eq!(parsed.clean.artifact_phrases.len(), 6);
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let text = r#"
            [fetch]
            binary_path = "yt-dlp"
            output_dir = "out"
            subtitle_languages = ["en"]
            subtitle_format = "vtt"
            video_format = "best"

            [translate]
            provider = "Ollama"
            endpoint = "http://localhost:11434"
            model = "llama3.2:3b"
            target_language = "Spanish"
            batch_size = 10
            max_tokens = 4000
            timeout_secs = 30

            [clean]
            remove_artifacts = false
            remove_markup = true
        "#;

        let config: Config = toml::from_str(text).unwrap();
        assert!(config.translate.enabled);
        assert_eq!(config.translate.rate_limit_delay_ms, 500);
        assert!(config.clean.artifact_phrases.contains(&"bản dịch".to_string()));
        assert!(config.translate.is_ready());
    }

    #[test]
    fn test_is_ready_requires_key_for_anthropic() {
        let mut config = Config::default();
        assert!(!config.translate.is_ready());

        config.translate.api_key = Some("key".to_string());
        assert!(config.translate.is_ready());

        config.translate.enabled = false;
        assert!(!config.translate.is_ready());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capfetch.toml");

        let mut config = Config::default();
        config.fetch.output_dir = "videos".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.fetch.output_dir, "videos");
    }

    #[test]
    fn test_malformed_file_reports_toml_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[fetch\nbinary_path = ").unwrap();

        assert!(matches!(Config::from_file(&path), Err(CapfetchError::Toml(_))));
        assert!(matches!(
            Config::from_file(dir.path().join("missing.toml")),
            Err(CapfetchError::Config(_))
        ));
    }
}
