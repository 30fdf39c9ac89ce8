//! Reply value returned by every completion call.

use serde::{Deserialize, Serialize};

use crate::llm::errors::LlmError;

/// Result of a completion call, successful or not.
///
/// Failures are carried as a human-readable `content` with no `model`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Generated text, or a failure explanation.
    pub content: String,
    /// Model that produced the content.
    pub model: Option<String>,
}

impl Reply {
    /// Build a reply.
    #[must_use]
    pub fn new(content: impl Into<String>, model: Option<String>) -> Self {
        Self {
            content: content.into(),
            model,
        }
    }

    /// Convert a classified failure into a displayable reply.
    #[must_use]
    pub fn from_error(err: &LlmError) -> Self {
        Self {
            content: err.to_string(),
            model: None,
        }
    }
}

impl From<LlmError> for Reply {
    fn from(err: LlmError) -> Self {
        Self::from_error(&err)
    }
}
