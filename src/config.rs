//! Process configuration read once at start-up from the environment.
//!
//! A provider is enabled only when its API key is present and non-empty. A missing
//! key is not an error; it just removes that provider from selection and fallback.

use crate::chat_gateway::DEFAULT_FIRST_BYTE_TIMEOUT;
use crate::error::{GatewayError, Result};
use crate::llm::gateway::CompletionConfig;
use crate::llm::gateways::{GeminiConfig, OpenAIConfig};
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub openai: Option<OpenAIConfig>,
    pub gemini: Option<GeminiConfig>,
    pub bind_addr: SocketAddr,
    pub first_byte_timeout: Duration,
    pub completion: CompletionConfig,
    pub data_file: Option<PathBuf>,
}

impl GatewayConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let openai = match var("OPENAI_API_KEY") {
            Some(key) => {
                let mut config = OpenAIConfig::new(key);
                if let Some(base_url) = var("OPENAI_API_ENDPOINT") {
                    config = config.with_base_url(base_url.trim_end_matches('/'));
                }
                if let Some(model) = var("OPENAI_MODEL") {
                    config = config.with_model(model);
                }
                if let Some(timeout) = seconds("OPENAI_TIMEOUT_SECS", var("OPENAI_TIMEOUT_SECS"))? {
                    config = config.with_timeout(timeout);
                }
                Some(config)
            }
            None => None,
        };

        let gemini = match var("GEMINI_API_KEY") {
            Some(key) => {
                let mut config = GeminiConfig::new(key);
                if let Some(base_url) = var("GEMINI_API_ENDPOINT") {
                    config = config.with_base_url(base_url.trim_end_matches('/'));
                }
                if let Some(model) = var("GEMINI_MODEL") {
                    config = config.with_model(model);
                }
                if let Some(timeout) = seconds("GEMINI_TIMEOUT_SECS", var("GEMINI_TIMEOUT_SECS"))? {
                    config = config.with_timeout(timeout);
                }
                Some(config)
            }
            None => None,
        };

        let bind = var("SMARTGROWTH_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|e| GatewayError::ConfigError(format!("SMARTGROWTH_BIND '{}': {}", bind, e)))?;

        let first_byte_timeout = seconds(
            "SMARTGROWTH_FIRST_BYTE_TIMEOUT_SECS",
            var("SMARTGROWTH_FIRST_BYTE_TIMEOUT_SECS"),
        )?
        .unwrap_or(DEFAULT_FIRST_BYTE_TIMEOUT);

        let temperature = parsed::<f32>("SMARTGROWTH_TEMPERATURE", var("SMARTGROWTH_TEMPERATURE"))?;
        if let Some(t) = temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(GatewayError::ConfigError(format!(
                    "SMARTGROWTH_TEMPERATURE must be between 0 and 2, got {}",
                    t
                )));
            }
        }
        let max_tokens = parsed::<usize>("SMARTGROWTH_MAX_TOKENS", var("SMARTGROWTH_MAX_TOKENS"))?;
        if max_tokens == Some(0) {
            return Err(GatewayError::ConfigError(
                "SMARTGROWTH_MAX_TOKENS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            openai,
            gemini,
            bind_addr,
            first_byte_timeout,
            completion: CompletionConfig {
                temperature,
                max_tokens,
            },
            data_file: var("SMARTGROWTH_DATA_FILE").map(PathBuf::from),
        })
    }
}

fn parsed<T>(key: &str, raw: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|raw| {
        raw.parse::<T>()
            .map_err(|e| GatewayError::ConfigError(format!("{} '{}': {}", key, raw, e)))
    })
    .transpose()
}

/// A whole number of seconds; zero is rejected.
fn seconds(key: &str, raw: Option<String>) -> Result<Option<Duration>> {
    match parsed::<u64>(key, raw)? {
        Some(0) => Err(GatewayError::ConfigError(format!(
            "{} must be greater than zero",
            key
        ))),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}
