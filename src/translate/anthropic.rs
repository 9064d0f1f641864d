use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{CapfetchError, Result};
use super::{build_prompt, BatchRequest, TranslationService};

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Low temperature keeps batch output close to the requested structure
const TEMPERATURE: f32 = 0.1;

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

impl MessagesResponse {
    /// Concatenated text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

/// Batch translation through the Anthropic messages API
pub struct AnthropicService {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl AnthropicService {
    pub fn new(api_key: String, endpoint: &str, model: &str) -> Result<Self> {
        let client = Client::builder().build()?;
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            endpoint.trim_end_matches('/').to_string()
        };

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: model.to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.endpoint)
    }
}

#[async_trait]
impl TranslationService for AnthropicService {
    async fn translate_batch(&self, request: &BatchRequest) -> Result<String> {
        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: TEMPERATURE,
            messages: vec![Message {
                role: "user".to_string(),
                content: build_prompt(request),
            }],
        };

        let url = self.messages_url();
        debug!("Sending batch of {} texts to: {}", request.item_count, url);

        let response = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| CapfetchError::Translation(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Anthropic API error ({}): {}", status, error_text);
            return Err(CapfetchError::Translation(format!(
                "Anthropic API error {}: {}",
                status, error_text
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| CapfetchError::Translation(format!("Failed to parse response: {}", e)))?;

        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(CapfetchError::Translation("Empty translation received".to_string()));
        }

        Ok(text.trim().to_string())
    }
}
