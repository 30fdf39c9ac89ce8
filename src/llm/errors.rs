//! Failure taxonomy for language model calls.

use thiserror::Error;

/// Classified failure of a language model call.
///
/// The display text of each variant is written for end users: it is what a
/// [`Reply`](crate::llm::Reply) carries when the call fails.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Host unreachable, DNS failure, or timeout.
    #[error(
        "Error connecting to the language model backend: {source}. Make sure it is running at {base_url}"
    )]
    Connectivity {
        /// Configured backend address.
        base_url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered 404 for this endpoint.
    #[error("endpoint {endpoint} is not supported by the language model backend")]
    EndpointUnsupported {
        /// Full endpoint URL.
        endpoint: String,
    },
    /// The response body yielded no content.
    #[error("The language model backend returned no usable content: {0}")]
    Protocol(String),
    /// Non-success status other than a recoverable 404.
    #[error("HTTP error calling the language model backend: {endpoint} returned status {status}")]
    BackendStatus {
        /// Full endpoint URL.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, kept for logs.
        body: String,
    },
    /// Anything else.
    #[error("Error calling the language model backend: {0}")]
    Unexpected(String),
}

impl LlmError {
    /// Classify a transport error from `reqwest`.
    #[must_use]
    pub fn from_transport(source: reqwest::Error, base_url: &str) -> Self {
        if source.is_connect() || source.is_timeout() || source.is_request() {
            Self::Connectivity {
                base_url: base_url.to_string(),
                source,
            }
        } else {
            Self::Unexpected(source.to_string())
        }
    }

    /// Stable failure class name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connectivity { .. } => "connectivity",
            Self::EndpointUnsupported { .. } => "endpoint_unsupported",
            Self::Protocol(_) => "protocol",
            Self::BackendStatus { .. } => "backend_status",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

/// Convenience result alias for language model calls.
pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(LlmError::Protocol("empty".into()).kind(), "protocol");
        assert_eq!(LlmError::Unexpected("boom".into()).kind(), "unexpected");
        let status = LlmError::BackendStatus {
            endpoint: "http://localhost/api/chat".into(),
            status: 500,
            body: String::new(),
        };
        assert_eq!(status.kind(), "backend_status");
        assert!(status.to_string().contains("500"));
    }
}
