pub mod gemini;
pub mod openai;
pub mod sse;

pub use gemini::{GeminiConfig, GeminiGateway};
pub use openai::{OpenAIConfig, OpenAIGateway};
