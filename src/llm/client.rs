//! Backend-agnostic completion interface.

use std::future::Future;
use std::pin::Pin;

use tracing::warn;

use crate::llm::errors::LlmResult;
use crate::llm::reply::Reply;

/// Boxed future type for completion client operations.
pub type CompletionFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A language model backend.
///
/// Implementors provide the classified [`LlmClient::try_complete`]; callers at the
/// outer boundary use [`LlmClient::complete`], which never fails.
pub trait LlmClient: Send + Sync {
    /// Complete `prompt`, keeping the failure classification.
    ///
    /// # Errors
    /// Returns the classified failure when no reply could be produced.
    fn try_complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a, LlmResult<Reply>>;

    /// Complete `prompt`. Failures come back as a reply explaining them.
    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a, Reply> {
        Box::pin(async move {
            match self.try_complete(prompt).await {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(kind = err.kind(), error = %err, "Completion failed");
                    Reply::from_error(&err)
                }
            }
        })
    }

    /// Model identifier used by subsequent calls. In-flight calls keep theirs.
    fn set_model(&self, model: &str);

    /// Current model identifier.
    fn model(&self) -> String;

    /// Model identifiers the backend offers.
    ///
    /// # Errors
    /// Returns the classified failure when the backend cannot be queried.
    fn list_models(&self) -> CompletionFuture<'_, LlmResult<Vec<String>>>;
}
