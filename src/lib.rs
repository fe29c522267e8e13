pub mod accounts;
pub mod chat_gateway;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod llm;
pub mod server;
pub mod tiers;

pub use error::{GatewayError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::accounts::{AccountRecord, AccountStore, InMemoryAccountStore};
    pub use crate::chat_gateway::{ChatGateway, ChatReply, ChatRequest};
    pub use crate::config::GatewayConfig;
    pub use crate::error::{GatewayError, Result};
    pub use crate::llm::gateways::{GeminiGateway, OpenAIGateway};
    pub use crate::llm::{CompletionConfig, LlmGateway, LlmMessage, MessageRole, ProviderKind};
    pub use crate::tiers::Tier;
}
