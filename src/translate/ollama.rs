use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{CapfetchError, Result};
use super::{build_prompt, BatchRequest, TranslationService};

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub done: bool,
}

/// Batch translation through a local Ollama server
pub struct OllamaService {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaService {
    pub fn new(endpoint: &str, model: &str) -> Result<Self> {
        let client = Client::builder().build()?;
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            endpoint.trim_end_matches('/').to_string()
        };

        Ok(Self {
            client,
            endpoint,
            model: model.to_string(),
        })
    }

    /// Check that the server is reachable and the model is pulled
    pub async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/api/show", self.endpoint);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "name": self.model }))
            .send()
            .await
            .map_err(|e| CapfetchError::Translation(format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.model);
            Ok(())
        } else {
            Err(CapfetchError::Translation(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.model, self.model
            )))
        }
    }
}

#[async_trait]
impl TranslationService for OllamaService {
    async fn translate_batch(&self, request: &BatchRequest) -> Result<String> {
        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: build_prompt(request),
            stream: false,
            options: GenerateOptions {
                temperature: 0.1,
                num_predict: request.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.endpoint);
        debug!("Sending batch of {} texts to: {}", request.item_count, url);

        let response = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| CapfetchError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CapfetchError::Translation(format!(
                "Ollama API error {}: {}",
                status, error_text
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CapfetchError::Translation(format!("Failed to parse response: {}", e)))?;

        let raw_response = generated.response.trim().to_string();
        debug!("Raw Ollama response: {}", raw_response);

        if raw_response.is_empty() {
            return Err(CapfetchError::Translation("Empty translation received".to_string()));
        }

        Ok(raw_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::test_server::serve_once;
    use std::time::Duration;

    fn request() -> BatchRequest {
        BatchRequest {
            text: "Hello".to_string(),
            target_language: "Japanese".to_string(),
            item_count: 1,
            max_tokens: 4050,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_translate_batch_posts_generate_request() {
        let (endpoint, captured) = serve_once(200, r#"{"response":"  こんにちは ","done":true}"#).await;

        let service = OllamaService::new(&endpoint, "llama3.2:3b").unwrap();
        assert_eq!(service.translate_batch(&request()).await.unwrap(), "こんにちは");

        let captured = captured.await.unwrap();
        assert!(captured.head.starts_with("POST /api/generate"));
        let json: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(json["model"], "llama3.2:3b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 4050);
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let (endpoint, _captured) = serve_once(200, r#"{"response":"   ","done":true}"#).await;

        let service = OllamaService::new(&endpoint, "m").unwrap();
        assert!(service.translate_batch(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_check_availability_reports_missing_model() {
        let (endpoint, _captured) = serve_once(404, r#"{"error":"model not found"}"#).await;

        let service = OllamaService::new(&endpoint, "missing").unwrap();
        let err = service.check_availability().await.unwrap_err();
        assert!(err.to_string().contains("ollama pull missing"));
    }
}
