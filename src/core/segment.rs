//! Transcript segment and summary record models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped, optionally speaker-attributed fragment of transcript text.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// When the fragment was spoken.
    pub timestamp: DateTime<Utc>,
    /// Transcribed text.
    pub text: String,
    /// Speaker label, when diarization provided one.
    pub speaker: Option<String>,
}

impl Segment {
    /// Build an unattributed segment stamped with the current time.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            text: text.into(),
            speaker: None,
        }
    }

    /// Build a speaker-attributed segment stamped with the current time.
    #[must_use]
    pub fn spoken(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            text: text.into(),
            speaker: Some(speaker.into()),
        }
    }

    /// Replace the timestamp.
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Renders the prompt line for this segment: `speaker: text`, or bare text.
impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.speaker {
            Some(speaker) => write!(f, "{speaker}: {}", self.text),
            None => f.write_str(&self.text),
        }
    }
}

/// A produced summary.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Summary text.
    pub text: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl SummaryRecord {
    /// Build a record stamped with the current time.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_and_without_speaker() {
        assert_eq!(
            Segment::spoken("Alice", "Let's start.").to_string(),
            "Alice: Let's start."
        );
        assert_eq!(Segment::new("[inaudible]").to_string(), "[inaudible]");
    }

    #[test]
    fn serializes_timestamp_as_rfc3339() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let segment = Segment::spoken("Bob", "Hi").at(ts);
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "timestamp": "2024-03-01T10:00:00Z",
                "text": "Hi",
                "speaker": "Bob"
            })
        );
    }
}
