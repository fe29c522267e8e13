//! Error types and result aliases for the SmartGrowth gateway.
//!
//! This module defines the core error type [`GatewayError`] and the [`Result`] type alias
//! used throughout the crate. The three request-level variants (`MalformedRequest`,
//! `InvalidProvider`, `UpstreamFailure`) are the ones the HTTP layer maps to status codes;
//! the rest describe lower-level failures that are folded into those before they reach
//! a client.

use thiserror::Error;

/// Generic message returned to clients when every provider attempt failed.
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Something went wrong. Try again later.";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("Provider API error: {0}")]
    ApiError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Account store error: {0}")]
    StoreError(String),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Timeout error: {0}")]
    TimeoutError(String),
}

impl GatewayError {
    /// Whether the error was caused by the caller rather than by a provider or the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedRequest(_) | Self::InvalidProvider(_))
    }

    /// Message that is safe to return to a client.
    ///
    /// Client errors carry their own description. Everything else collapses to
    /// [`UPSTREAM_FAILURE_MESSAGE`] so provider details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::MalformedRequest(msg) => msg.clone(),
            Self::InvalidProvider(msg) => msg.clone(),
            _ => UPSTREAM_FAILURE_MESSAGE.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
