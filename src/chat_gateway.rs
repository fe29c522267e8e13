//! Chat request routing with tier directives and single-hop provider fallback.
//!
//! A request moves through `Received → TierResolved → DirectiveAppended →
//! Dispatched(primary)` and ends either `Streaming` or, after at most one
//! `Dispatched(fallback)`, `Failed`. Nothing about a request outlives it.

use crate::accounts::AccountStore;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway, TextStream};
use crate::llm::gateways::{GeminiGateway, OpenAIGateway};
use crate::llm::models::LlmMessage;
use crate::llm::provider::ProviderKind;
use crate::tiers::{self, Tier};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_FIRST_BYTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body used when no requested or fallback provider can be used.
pub const NO_PROVIDER_MESSAGE: &str = "No valid provider or API key.";

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<LlmMessage>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

impl ChatRequest {
    /// Parse a request body, reporting any shape problem as a malformed request.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| GatewayError::MalformedRequest(e.to_string()))
    }
}

/// A reply that is streaming, with the provider that ended up serving it.
pub struct ChatReply {
    pub provider: ProviderKind,
    pub tier: Tier,
    pub stream: TextStream,
}

/// Routes chat requests to OpenAI or Gemini.
///
/// Providers are optional: one without a credential is simply absent and is skipped
/// both as a primary and as a fallback.
pub struct ChatGateway {
    openai: Option<Arc<dyn LlmGateway>>,
    gemini: Option<Arc<dyn LlmGateway>>,
    accounts: Option<Arc<dyn AccountStore>>,
    completion: CompletionConfig,
    first_byte_timeout: Duration,
}

impl ChatGateway {
    /// Create a gateway with no providers configured.
    pub fn new() -> Self {
        Self {
            openai: None,
            gemini: None,
            accounts: None,
            completion: CompletionConfig::default(),
            first_byte_timeout: DEFAULT_FIRST_BYTE_TIMEOUT,
        }
    }

    /// Build the provider gateways for every credential present in `config`.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let mut gateway = Self::new()
            .with_first_byte_timeout(config.first_byte_timeout)
            .with_completion_config(config.completion.clone());

        if let Some(openai) = &config.openai {
            gateway = gateway
                .with_provider(ProviderKind::OpenAi, Arc::new(OpenAIGateway::with_config(openai.clone())?));
        }
        if let Some(gemini) = &config.gemini {
            gateway = gateway
                .with_provider(ProviderKind::Gemini, Arc::new(GeminiGateway::with_config(gemini.clone())?));
        }

        Ok(gateway)
    }

    pub fn with_provider(mut self, kind: ProviderKind, gateway: Arc<dyn LlmGateway>) -> Self {
        match kind {
            ProviderKind::OpenAi => self.openai = Some(gateway),
            ProviderKind::Gemini => self.gemini = Some(gateway),
        }
        self
    }

    pub fn with_account_store(mut self, accounts: Arc<dyn AccountStore>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn with_completion_config(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_first_byte_timeout(mut self, timeout: Duration) -> Self {
        self.first_byte_timeout = timeout;
        self
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&Arc<dyn LlmGateway>> {
        match kind {
            ProviderKind::OpenAi => self.openai.as_ref(),
            ProviderKind::Gemini => self.gemini.as_ref(),
        }
    }

    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.provider(kind).is_some()
    }

    /// Resolve the tier for a request: explicit label first, then the account store.
    pub async fn resolve_tier(&self, tier: Option<&str>, account_id: Option<&str>) -> Tier {
        if tier.is_some() {
            return Tier::resolve(tier);
        }

        let (Some(accounts), Some(account_id)) = (&self.accounts, account_id) else {
            return Tier::default();
        };

        match accounts.find_account(account_id).await {
            Ok(Some(record)) => record.tier(),
            Ok(None) => {
                debug!(account_id = account_id, "Account not found, using default tier");
                Tier::default()
            }
            Err(e) => {
                warn!(account_id = account_id, error = %e, "Tier lookup failed, using default tier");
                Tier::default()
            }
        }
    }

    /// Handle one chat request and return the live reply stream.
    pub async fn dispatch(&self, request: ChatRequest) -> Result<ChatReply> {
        if request.messages.is_empty() {
            return Err(GatewayError::MalformedRequest(
                "messages must be a non-empty array".to_string(),
            ));
        }

        let requested: ProviderKind = request
            .provider
            .as_deref()
            .ok_or_else(|| GatewayError::InvalidProvider(NO_PROVIDER_MESSAGE.to_string()))?
            .parse()?;

        let tier = self.resolve_tier(request.tier.as_deref(), request.account_id.as_deref()).await;
        debug!(tier = %tier, "Tier resolved");

        let messages = tiers::with_directive(&request.messages, tier);
        debug!(message_count = messages.len(), "Directive appended");

        // At most two attempts: the requested provider, then its alternate.
        let attempts: Vec<(ProviderKind, Arc<dyn LlmGateway>)> = [requested, requested.alternate()]
            .into_iter()
            .filter_map(|kind| self.provider(kind).cloned().map(|gateway| (kind, gateway)))
            .collect();

        if attempts.is_empty() {
            warn!(provider = %requested, "No provider configured");
            return Err(GatewayError::InvalidProvider(NO_PROVIDER_MESSAGE.to_string()));
        }

        for (kind, gateway) in &attempts {
            let role = if *kind == requested { "primary" } else { "fallback" };
            info!(provider = %kind, role = role, "Dispatching chat request");

            match self.open(gateway.as_ref(), &messages).await {
                Ok(stream) => {
                    info!(provider = %kind, role = role, "Streaming reply");
                    return Ok(ChatReply {
                        provider: *kind,
                        tier,
                        stream,
                    });
                }
                Err(e) => {
                    warn!(provider = %kind, role = role, error = %e, "Provider attempt failed");
                }
            }
        }

        if !self.is_configured(requested) {
            return Err(GatewayError::InvalidProvider(NO_PROVIDER_MESSAGE.to_string()));
        }

        let tried: Vec<&str> = attempts.iter().map(|(kind, _)| kind.as_str()).collect();
        Err(GatewayError::UpstreamFailure(format!(
            "all provider attempts failed ({})",
            tried.join(", ")
        )))
    }

    /// Open a provider stream and wait for its first chunk.
    ///
    /// The attempt counts as successful only once the first chunk (or a clean end of
    /// stream) arrives within the first-byte timeout.
    async fn open(&self, gateway: &dyn LlmGateway, messages: &[LlmMessage]) -> Result<TextStream> {
        tokio::time::timeout(self.first_byte_timeout, self.first_chunk(gateway, messages))
            .await
            .map_err(|_| {
                GatewayError::TimeoutError(format!(
                    "{} produced no output within {:?}",
                    gateway.name(),
                    self.first_byte_timeout
                ))
            })?
    }

    /// Pull the first chunk and put it back in front of the remaining stream so the
    /// caller sees the reply unmodified.
    async fn first_chunk(&self, gateway: &dyn LlmGateway, messages: &[LlmMessage]) -> Result<TextStream> {
        let mut upstream = gateway.complete_stream(messages, &self.completion).await?;

        match upstream.next().await {
            Some(Ok(first)) => {
                let replay = stream::iter(std::iter::once(Ok(first)));
                Ok(Box::pin(replay.chain(upstream)))
            }
            Some(Err(e)) => Err(e),
            None => Ok(Box::pin(stream::empty::<Result<String>>())),
        }
    }
}

impl Default for ChatGateway {
    fn default() -> Self {
        Self::new()
    }
}
