//! OpenAI Gateway for streaming chat completions.
//!
//! The conversation is forwarded as a list of role/content messages to the
//! `chat/completions` endpoint with `stream: true`, and the `delta.content` of every
//! server-sent event becomes one chunk of the reply.

use crate::error::{GatewayError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway, TextStream};
use crate::llm::gateways::sse;
use crate::llm::models::LlmMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Configuration for connecting to OpenAI API.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Option<Duration>,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
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

/// Gateway for OpenAI LLM service.
pub struct OpenAIGateway {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIGateway {
    /// Create a new OpenAI gateway with custom configuration.
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder
            .build()
            .map_err(|e| GatewayError::ConfigError(format!("OpenAI client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create gateway with custom API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn request_body(&self, messages: &[LlmMessage], config: &CompletionConfig) -> Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
        });

        if let Some(temperature) = config.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = config.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }
}

/// Text carried by one `chat.completion.chunk` event.
fn extract_delta(event: &Value) -> Option<String> {
    event["choices"][0]["delta"]["content"].as_str().map(String::from)
}

#[async_trait]
impl LlmGateway for OpenAIGateway {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_stream(
        &self,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<TextStream> {
        info!("Starting OpenAI streaming completion");
        debug!("Model: {}, Message count: {}", self.config.model, messages.len());

        let body = self.request_body(messages, config);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::ApiError(format!(
                "OpenAI API error: {} - {}",
                status, error_text
            )));
        }

        Ok(sse::text_stream(response, "openai", extract_delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::StreamExt;

    async fn collect(stream: TextStream) -> Vec<Result<String>> {
        stream.collect().await
    }

    #[test]
    fn test_openai_config_defaults() {
        let config = OpenAIConfig::new("test-key");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_openai_config_builders() {
        let config = OpenAIConfig::new("key")
            .with_base_url("https://custom.com")
            .with_model("gpt-4o")
            .with_timeout(Duration::from_secs(30));
        assert_eq!(config.base_url, "https://custom.com");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_gateway_with_api_key() {
        let gateway = OpenAIGateway::with_api_key("my-api-key").unwrap();
        assert_eq!(gateway.config().api_key, "my-api-key");
        assert_eq!(gateway.name(), "openai");
    }

    #[test]
    fn test_request_body_forwards_messages() {
        let gateway = OpenAIGateway::with_api_key("key").unwrap();
        let messages = vec![LlmMessage::user("Hi"), LlmMessage::system("Be helpful")];
        let body = gateway.request_body(&messages, &CompletionConfig::default());

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Be helpful");
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_body_with_sampling() {
        let gateway = OpenAIGateway::with_api_key("key").unwrap();
        let config = CompletionConfig {
            temperature: Some(0.5),
            max_tokens: Some(256),
        };
        let body = gateway.request_body(&[LlmMessage::user("Hi")], &config);

        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn test_extract_delta() {
        let event = serde_json::json!({"choices":[{"delta":{"content":"Hel"}}]});
        assert_eq!(extract_delta(&event), Some("Hel".to_string()));

        let role_only = serde_json::json!({"choices":[{"delta":{"role":"assistant"}}]});
        assert_eq!(extract_delta(&role_only), None);

        let no_choices = serde_json::json!({"choices":[]});
        assert_eq!(extract_delta(&no_choices), None);
    }

    #[tokio::test]
    async fn test_complete_stream_success() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Grow \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"your ROI.\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"gpt-4o-mini","stream":true}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let gateway = OpenAIGateway::with_config(
            OpenAIConfig::new("test-key").with_base_url(server.url()),
        )
        .unwrap();
        let stream = gateway
            .complete_stream(&[LlmMessage::user("Hi")], &CompletionConfig::default())
            .await
            .unwrap();
        let chunks: Vec<String> = collect(stream).await.into_iter().map(|c| c.unwrap()).collect();

        mock.assert_async().await;
        assert_eq!(chunks, vec!["Grow ".to_string(), "your ROI.".to_string()]);
    }

    #[tokio::test]
    async fn test_complete_stream_error_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;

        let gateway = OpenAIGateway::with_config(
            OpenAIConfig::new("bad-key").with_base_url(server.url()),
        )
        .unwrap();
        let result = gateway
            .complete_stream(&[LlmMessage::user("Hi")], &CompletionConfig::default())
            .await;

        mock.assert_async().await;
        match result {
            Err(GatewayError::ApiError(msg)) => assert!(msg.contains("401")),
            _ => panic!("Expected ApiError"),
        }
    }

    #[tokio::test]
    async fn test_complete_stream_error_event() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Partial\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"overloaded\"}}\n\n",
        );
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let gateway = OpenAIGateway::with_config(
            OpenAIConfig::new("test-key").with_base_url(server.url()),
        )
        .unwrap();
        let stream = gateway
            .complete_stream(&[LlmMessage::user("Hi")], &CompletionConfig::default())
            .await
            .unwrap();
        let items = collect(stream).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Partial");
        assert!(matches!(items[1], Err(GatewayError::ApiError(_))));
    }
}
