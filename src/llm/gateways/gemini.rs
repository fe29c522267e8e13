//! Gemini Gateway for streaming content generation.
//!
//! Gemini receives the conversation as a single accumulated prompt: every message is
//! rendered as `role: content` and the lines are joined with newlines. The reply is
//! requested through `streamGenerateContent?alt=sse` so it arrives as server-sent
//! events, the same shape the OpenAI gateway consumes.

use crate::error::{GatewayError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway, TextStream};
use crate::llm::gateways::sse;
use crate::llm::models::LlmMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Configuration for connecting to the Gemini API.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Bound on the whole request, including the streamed body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Gateway for Google's Gemini models.
pub struct GeminiGateway {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGateway {
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder
            .build()
            .map_err(|e| GatewayError::ConfigError(format!("Gemini client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(GeminiConfig::new(api_key))
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url,
            urlencoding::encode(&self.config.model)
        )
    }

    fn request_body(&self, messages: &[LlmMessage], config: &CompletionConfig) -> Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": flatten_conversation(messages) }],
            }],
        });

        let mut generation = serde_json::Map::new();
        if let Some(temperature) = config.temperature {
            generation.insert("temperature".to_string(), serde_json::json!(temperature));
        }
        if let Some(max_tokens) = config.max_tokens {
            generation.insert("maxOutputTokens".to_string(), serde_json::json!(max_tokens));
        }
        if !generation.is_empty() {
            body["generationConfig"] = Value::Object(generation);
        }

        body
    }
}

/// Render the conversation as one prompt string, one `role: content` line per message.
pub fn flatten_conversation(messages: &[LlmMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of the first candidate in one `GenerateContentResponse` event.
fn extract_candidate_text(event: &Value) -> Option<String> {
    let parts = event["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    Some(text)
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete_stream(
        &self,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<TextStream> {
        info!("Starting Gemini streaming completion");
        debug!("Model: {}, Message count: {}", self.config.model, messages.len());

        let body = self.request_body(messages, config);

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::ApiError(format!(
                "Gemini API error: {} - {}",
                status, error_text
            )));
        }

        Ok(sse::text_stream(response, "gemini", extract_candidate_text))
    }
}
