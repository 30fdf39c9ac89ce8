//! Ollama HTTP client for summarization completions.
//!
//! Behaviour:
//! - `POST /api/chat` with a system and a user message, streaming disabled.
//! - On `404`, fall back once to `POST /api/generate` with the system instruction
//!   and the prompt joined by a blank line.
//! - Response bodies go through [`extract_content`], which accepts a single
//!   object or newline-delimited chunks.
//! - `GET /api/tags` lists installed models.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::config::LlmConfig;
use crate::llm::client::{CompletionFuture, LlmClient};
use crate::llm::errors::{LlmError, LlmResult};
use crate::llm::parse::{ParseStrategy, ResponseShape, extract_content};
use crate::llm::prompts::SYSTEM_PROMPT;
use crate::llm::reply::Reply;

/// Chat-style completion endpoint.
const CHAT_PATH: &str = "/api/chat";
/// Legacy single-prompt completion endpoint.
const GENERATE_PATH: &str = "/api/generate";
/// Installed model listing.
const TAGS_PATH: &str = "/api/tags";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    #[serde(default)]
    name: String,
}

/// Ollama client. Holds no per-call state besides the model identifier.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: RwLock<String>,
    system_prompt: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|err| LlmError::Unexpected(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: RwLock::new(config.model.clone()),
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| SYSTEM_PROMPT.to_string()),
            timeout: config.timeout(),
        })
    }

    /// Replace the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// System instruction sent with every completion.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_chat(&self, model: &str, prompt: &str) -> LlmResult<Reply> {
        let endpoint = self.endpoint(CHAT_PATH);
        let request = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        };

        let response = self.post_json(&endpoint, &request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(LlmError::EndpointUnsupported { endpoint });
        }

        let body = self.read_success_body(&endpoint, response).await?;
        parse_reply(&body, ResponseShape::Chat, model)
    }

    async fn post_generate(&self, model: &str, prompt: &str) -> LlmResult<Reply> {
        let endpoint = self.endpoint(GENERATE_PATH);
        let combined = format!("{}\n\n{prompt}", self.system_prompt);
        let request = GenerateRequest {
            model,
            prompt: &combined,
            stream: false,
        };

        let response = self.post_json(&endpoint, &request).await?;
        let body = self.read_success_body(&endpoint, response).await?;
        parse_reply(&body, ResponseShape::Generate, model)
    }

    async fn post_json<T: Serialize + Sync>(&self, endpoint: &str, body: &T) -> LlmResult<Response> {
        self.http
            .post(endpoint)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| LlmError::from_transport(err, &self.base_url))
    }

    async fn read_success_body(&self, endpoint: &str, response: Response) -> LlmResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| LlmError::from_transport(err, &self.base_url))?;

        if !status.is_success() {
            return Err(LlmError::BackendStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

fn parse_reply(body: &str, shape: ResponseShape, model: &str) -> LlmResult<Reply> {
    let parsed = extract_content(body, shape)?;
    match parsed.strategy {
        ParseStrategy::RawBody => {
            warn!(?shape, bytes = body.len(), "No content field in response, using raw body");
        }
        strategy => {
            debug!(?shape, ?strategy, chars = parsed.text.len(), "Parsed completion");
        }
    }
    Ok(Reply::new(parsed.text, Some(model.to_string())))
}

impl LlmClient for OllamaClient {
    fn try_complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a, LlmResult<Reply>> {
        Box::pin(async move {
            let model = self.model();
            match self.post_chat(&model, prompt).await {
                Err(LlmError::EndpointUnsupported { endpoint }) => {
                    debug!(%endpoint, "Chat endpoint unsupported, falling back to generate");
                    self.post_generate(&model, prompt).await
                }
                other => other,
            }
        })
    }

    fn set_model(&self, model: &str) {
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = model.to_string();
    }

    fn model(&self) -> String {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn list_models(&self) -> CompletionFuture<'_, LlmResult<Vec<String>>> {
        Box::pin(async move {
            let endpoint = self.endpoint(TAGS_PATH);
            let response = self
                .http
                .get(&endpoint)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|err| LlmError::from_transport(err, &self.base_url))?;
            let body = self.read_success_body(&endpoint, response).await?;
            let tags: TagsResponse = serde_json::from_str(&body)
                .map_err(|err| LlmError::Protocol(format!("invalid model list: {err}")))?;

            Ok(tags
                .models
                .into_iter()
                .map(|entry| entry.name)
                .filter(|name| !name.is_empty())
                .collect())
        })
    }
}
