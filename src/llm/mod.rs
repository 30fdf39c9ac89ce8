//! Language model client: completion interface, Ollama adapter, and response parsing.

pub mod client;
pub mod errors;
pub mod ollama;
pub mod parse;
pub mod prompts;
pub mod reply;

pub use client::{CompletionFuture, LlmClient};
pub use errors::{LlmError, LlmResult};
pub use ollama::OllamaClient;
pub use parse::{ParseStrategy, ParsedContent, ResponseShape, extract_content};
pub use prompts::SYSTEM_PROMPT;
pub use reply::Reply;
