pub mod gateway;
pub mod gateways;
pub mod models;
pub mod provider;

pub use gateway::{CompletionConfig, LlmGateway, TextStream};
pub use models::{LlmMessage, MessageRole};
pub use provider::ProviderKind;
