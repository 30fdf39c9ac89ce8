//! Configuration for the ingestion and summarization pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use url::Url;

use crate::core::errors::{PipelineError, PipelineResult};

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "LIVE_DIGEST_CONFIG";
/// Environment override for the backend base URL.
pub const OLLAMA_URL_ENV: &str = "LIVE_DIGEST_OLLAMA_URL";
/// Environment override for the active model.
pub const MODEL_ENV: &str = "LIVE_DIGEST_MODEL";
/// Environment override for the summarization interval, in seconds.
pub const INTERVAL_ENV: &str = "LIVE_DIGEST_INTERVAL_SECS";
/// Environment override for the bus capacity.
pub const BUS_CAPACITY_ENV: &str = "LIVE_DIGEST_BUS_CAPACITY";
/// Environment override for the `SQLite` database path.
pub const DB_PATH_ENV: &str = "LIVE_DIGEST_DB_PATH";

/// Largest accepted summarization interval: one day.
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;
/// Largest accepted per-call or connect timeout: one hour.
pub const MAX_TIMEOUT_SECS: u64 = 60 * 60;

/// Top-level pipeline configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Language model backend settings.
    pub llm: LlmConfig,
    /// Summarizer cadence and policies.
    pub summarizer: SummarizerConfig,
    /// Segment bus settings.
    pub bus: BusConfig,
    /// Persistence settings.
    pub storage: StorageConfig,
}

impl PipelineConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read, an override does not
    /// parse, or the result fails validation.
    pub fn from_env() -> PipelineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    ///
    /// # Errors
    /// Same as [`PipelineConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_json_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(url) = lookup(OLLAMA_URL_ENV) {
            config.llm.base_url = url;
        }
        if let Some(model) = lookup(MODEL_ENV) {
            config.llm.model = model;
        }
        if let Some(raw) = lookup(INTERVAL_ENV) {
            config.summarizer.interval_secs = parse_override(INTERVAL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(BUS_CAPACITY_ENV) {
            config.bus.capacity = parse_override(BUS_CAPACITY_ENV, &raw)?;
        }
        if let Some(path) = lookup(DB_PATH_ENV) {
            config.storage.sqlite_path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> PipelineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.summarizer.interval_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "summarizer.interval_secs must be > 0".to_string(),
            ));
        }

        if self.summarizer.interval_secs > MAX_INTERVAL_SECS {
            return Err(PipelineError::InvalidConfig(format!(
                "summarizer.interval_secs must be <= {MAX_INTERVAL_SECS}"
            )));
        }

        if self.bus.capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "bus.capacity must be > 0".to_string(),
            ));
        }

        if self.bus.capacity > Semaphore::MAX_PERMITS {
            return Err(PipelineError::InvalidConfig(format!(
                "bus.capacity must be <= {}",
                Semaphore::MAX_PERMITS
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "llm.timeout_secs must be > 0".to_string(),
            ));
        }

        if self.llm.timeout_secs > MAX_TIMEOUT_SECS
            || self.llm.connect_timeout_secs > MAX_TIMEOUT_SECS
        {
            return Err(PipelineError::InvalidConfig(format!(
                "llm timeouts must be <= {MAX_TIMEOUT_SECS} seconds"
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }

        Url::parse(&self.llm.base_url)?;

        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, raw: &str) -> PipelineResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| PipelineError::InvalidConfig(format!("{key} is not a valid number: {raw}")))
}

/// Language model backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend base URL, without a trailing path.
    pub base_url: String,
    /// Model identifier used for completions.
    pub model: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Overrides the built-in system instruction.
    pub system_prompt: Option<String>,
}

impl LlmConfig {
    /// Per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_secs: 120,
            connect_timeout_secs: 5,
            system_prompt: None,
        }
    }
}

/// What a summarization cycle does when the backend call fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Publish and persist the failure explanation as the new summary.
    #[default]
    PublishMessage,
    /// Log the failure and keep the previous summary.
    KeepPrevious,
}

/// What the summarizer does with segments still on the bus when it stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Run one last cycle over the remaining segments.
    #[default]
    Flush,
    /// Drain the remaining segments and log how many were dropped.
    Discard,
}

/// Summarizer settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Seconds between ticks.
    pub interval_secs: u64,
    /// Prefix each prompt with the last successful summary.
    pub carry_previous_summary: bool,
    /// Behaviour on a failed backend call.
    pub on_failure: FailurePolicy,
    /// Behaviour for buffered segments at shutdown.
    pub on_shutdown: ShutdownPolicy,
}

impl SummarizerConfig {
    /// Tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            carry_previous_summary: true,
            on_failure: FailurePolicy::PublishMessage,
            on_shutdown: ShutdownPolicy::Flush,
        }
    }
}

/// What `put` does when the bus is at capacity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Suspend the producer until space frees up.
    #[default]
    Block,
    /// Fail immediately with [`PipelineError::BusFull`].
    Reject,
}

/// Segment bus settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Maximum number of queued segments.
    pub capacity: usize,
    /// Behaviour when full.
    pub overflow: OverflowPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            overflow: OverflowPolicy::Block,
        }
    }
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("live_digest.sqlite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.llm.base_url, "http://127.0.0.1:11434");
        assert_eq!(config.llm.timeout(), Duration::from_secs(120));
        assert_eq!(config.summarizer.interval(), Duration::from_secs(15));
        assert_eq!(config.summarizer.on_failure, FailurePolicy::PublishMessage);
        assert_eq!(config.bus.overflow, OverflowPolicy::Block);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            (OLLAMA_URL_ENV, "http://10.0.0.5:11434"),
            (MODEL_ENV, "mistral:7b"),
            (INTERVAL_ENV, "30"),
            (BUS_CAPACITY_ENV, "64"),
            (DB_PATH_ENV, "/tmp/digest.sqlite"),
        ]))
        .unwrap();

        assert_eq!(config.llm.base_url, "http://10.0.0.5:11434");
        assert_eq!(config.llm.model, "mistral:7b");
        assert_eq!(config.summarizer.interval_secs, 30);
        assert_eq!(config.bus.capacity, 64);
        assert_eq!(config.storage.sqlite_path, PathBuf::from("/tmp/digest.sqlite"));
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup_from(&[(INTERVAL_ENV, "soon")]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = PipelineConfig::default();
        config.bus.capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));

        let mut config = PipelineConfig::default();
        config.summarizer.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_values() {
        let err = PipelineConfig::from_lookup(lookup_from(&[(
            BUS_CAPACITY_ENV,
            "18446744073709551615",
        )]))
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));

        let mut config = PipelineConfig::default();
        config.bus.capacity = Semaphore::MAX_PERMITS;
        assert!(config.validate().is_ok());

        let mut config = PipelineConfig::default();
        config.summarizer.interval_secs = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));

        let mut config = PipelineConfig::default();
        config.summarizer.interval_secs = MAX_INTERVAL_SECS;
        assert!(config.validate().is_ok());

        let mut config = PipelineConfig::default();
        config.llm.timeout_secs = MAX_TIMEOUT_SECS + 1;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.llm.connect_timeout_secs = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = PipelineConfig::default();
        config.llm.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(PipelineError::Url(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"summarizer": {"interval_secs": 5, "on_failure": "keep_previous"}}"#,
        )
        .unwrap();
        assert_eq!(config.summarizer.interval_secs, 5);
        assert_eq!(config.summarizer.on_failure, FailurePolicy::KeepPrevious);
        assert!(config.summarizer.carry_previous_summary);
        assert_eq!(config.bus.capacity, 1024);
    }
}
