//! Tolerant parsing of backend response bodies.
//!
//! The backend may answer with one JSON object, or with newline-delimited JSON
//! chunks even when streaming was disabled. Both are collapsed into one string.

use serde_json::Value;

use crate::llm::errors::{LlmError, LlmResult};

/// Which endpoint produced the body; decides where content lives.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseShape {
    /// `/api/chat`: content under `message.content`.
    Chat,
    /// `/api/generate`: content under `response`.
    Generate,
}

impl ResponseShape {
    /// Content of a whole-body object, if it has the expected field.
    fn inline_content(self, value: &Value) -> Option<String> {
        match self {
            Self::Chat => value.get("message").map(|message| {
                message
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            }),
            Self::Generate => value
                .get("response")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    /// Non-empty content fragment of one chunk.
    fn fragment(self, chunk: &Value) -> Option<&str> {
        let fragment = match self {
            Self::Chat => chunk
                .get("message")
                .and_then(|message| message.get("content"))
                .and_then(Value::as_str),
            Self::Generate => chunk.get("response").and_then(Value::as_str),
        };
        fragment.filter(|text| !text.is_empty())
    }
}

/// How the content was obtained.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseStrategy {
    /// The body was a single JSON object.
    Inline,
    /// The body was NDJSON; `chunks` fragments were joined.
    Chunked {
        /// Number of fragments accumulated.
        chunks: usize,
    },
    /// Nothing parsed; the raw body is the content.
    RawBody,
}

/// Extracted content with the strategy that produced it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedContent {
    /// Content text.
    pub text: String,
    /// Strategy used.
    pub strategy: ParseStrategy,
}

/// Extract reply content from a response body.
///
/// Tries the whole body as one object first. Otherwise each non-blank line is
/// parsed on its own, unparsable lines are skipped, fragments are joined in
/// order, and accumulation stops at the first chunk with `"done": true`. With no
/// fragments at all the raw body is returned.
///
/// # Errors
/// Returns [`LlmError::Protocol`] when the body is blank.
pub fn extract_content(body: &str, shape: ResponseShape) -> LlmResult<ParsedContent> {
    if body.trim().is_empty() {
        return Err(LlmError::Protocol("empty response body".to_string()));
    }

    let inline = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| shape.inline_content(&value));
    if let Some(text) = inline {
        return Ok(ParsedContent {
            text,
            strategy: ParseStrategy::Inline,
        });
    }

    let chunks: Vec<Value> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .collect();
    let mut parts: Vec<&str> = Vec::new();
    for chunk in &chunks {
        if let Some(fragment) = shape.fragment(chunk) {
            parts.push(fragment);
        }
        if chunk.get("done").and_then(Value::as_bool) == Some(true) {
            break;
        }
    }

    if parts.is_empty() {
        return Ok(ParsedContent {
            text: body.to_string(),
            strategy: ParseStrategy::RawBody,
        });
    }

    Ok(ParsedContent {
        text: parts.concat(),
        strategy: ParseStrategy::Chunked {
            chunks: parts.len(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_object_chat() {
        let body = r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hello"},"done":true}"#;
        let parsed = extract_content(body, ResponseShape::Chat).unwrap();
        assert_eq!(parsed.text, "Hello");
        assert_eq!(parsed.strategy, ParseStrategy::Inline);
    }

    #[test]
    fn test_single_object_and_one_chunk_agree() {
        let single = r#"{"message":{"content":"Discussed revenue."},"done":true}"#;
        let ndjson = "{\"message\":{\"content\":\"Discussed revenue.\"},\"done\":true}\n";
        let chunked = "{\"message\":{\"content\":\"Discussed \"}}\n{\"message\":{\"content\":\"revenue.\"},\"done\":true}\n";

        let a = extract_content(single, ResponseShape::Chat).unwrap();
        let b = extract_content(ndjson, ResponseShape::Chat).unwrap();
        let c = extract_content(chunked, ResponseShape::Chat).unwrap();
        assert_eq!(a.text, b.text);
        assert_eq!(a.text, c.text);
        assert_eq!(c.strategy, ParseStrategy::Chunked { chunks: 2 });
    }

    #[test]
    fn test_chunks_after_done_are_ignored() {
        let body = concat!(
            "{\"message\":{\"content\":\"A\"}}\n",
            "{\"message\":{\"content\":\"B\"},\"done\":true}\n",
            "{\"message\":{\"content\":\"C\"}}\n",
        );
        let parsed = extract_content(body, ResponseShape::Chat).unwrap();
        assert_eq!(parsed.text, "AB");
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let body = "{\"response\":\"Hel\"}\nnot json at all\n\n   \n{\"response\":\"lo\",\"done\":true}";
        let parsed = extract_content(body, ResponseShape::Generate).unwrap();
        assert_eq!(parsed.text, "Hello");
    }

    #[test]
    fn test_generate_single_object() {
        let parsed =
            extract_content(r#"{"response":"Short recap","done":true}"#, ResponseShape::Generate)
                .unwrap();
        assert_eq!(parsed.text, "Short recap");
        assert_eq!(parsed.strategy, ParseStrategy::Inline);
    }

    #[test]
    fn test_object_without_expected_field_falls_back_to_body() {
        let body = r#"{"error":"model 'ghost' not found"}"#;
        let parsed = extract_content(body, ResponseShape::Chat).unwrap();
        assert_eq!(parsed.text, body);
        assert_eq!(parsed.strategy, ParseStrategy::RawBody);
    }

    #[test]
    fn test_unparsable_body_is_returned_verbatim() {
        let body = "<html>502 Bad Gateway</html>";
        let parsed = extract_content(body, ResponseShape::Generate).unwrap();
        assert_eq!(parsed.text, body);
    }

    #[test]
    fn test_blank_body_is_a_protocol_error() {
        let err = extract_content(" \n ", ResponseShape::Chat).unwrap_err();
        assert!(matches!(err, LlmError::Protocol(_)));
    }
}
