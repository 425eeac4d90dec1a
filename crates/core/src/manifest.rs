//! Deferred-function manifest and per-call execution options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::schedule::TimeSpec;

/// Schema version of the manifest, reported to the backend.
pub const INTERNAL_VERSION: u32 = 3;

/// Free-form tags attached to an execution.
pub type ExecutionMetadata = BTreeMap<String, String>;

/// Maximum number of concurrent executions of one function (0 to 50).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Concurrency(u8);

impl Concurrency {
    /// Largest accepted value.
    pub const MAX: u8 = 50;

    /// Create a concurrency limit, rejecting values above [`Concurrency::MAX`].
    pub fn new(limit: u8) -> Result<Self> {
        if limit > Self::MAX {
            return Err(CoreError::invalid_configuration(format!(
                "concurrency must be between 0 and {}, got {limit}",
                Self::MAX
            )));
        }
        Ok(Self(limit))
    }

    /// The limit as a plain integer.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Concurrency {
    type Error = CoreError;

    fn try_from(limit: u8) -> Result<Self> {
        Self::new(limit)
    }
}

impl From<Concurrency> for u8 {
    fn from(c: Concurrency) -> Self {
        c.0
    }
}

/// Options given when a function is wrapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredFunctionConfiguration {
    /// Retry configuration, in any accepted shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    /// Concurrency limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<Concurrency>,
    /// Maximum run time, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u64>,
}

impl DeferredFunctionConfiguration {
    /// Parse a configuration from loosely typed JSON.
    ///
    /// Unrecognized retry shapes and out-of-range concurrency values fail with
    /// [`CoreError::InvalidConfiguration`].
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| CoreError::invalid_configuration(e.to_string()))
    }

    /// Set the retry configuration.
    #[must_use]
    pub fn retry(mut self, retry: impl Into<RetryConfig>) -> Self {
        self.retry = Some(retry.into());
        self
    }

    /// Set the concurrency limit.
    #[must_use]
    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Set the maximum run time, in seconds.
    #[must_use]
    pub fn max_duration(mut self, seconds: u64) -> Self {
        self.max_duration = Some(seconds);
        self
    }
}

/// Metadata attached to a deferred function when it is wrapped.
///
/// Built once and shared by every value derived from the same wrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Manifest schema version
    pub version: u32,
    /// Cron expression for recurring functions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    /// Resolved retry policy
    pub retry: RetryPolicy,
    /// Concurrency limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<Concurrency>,
    /// Maximum run time, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u64>,
}

impl Manifest {
    /// Build a manifest from wrap-time configuration.
    pub fn new(config: &DeferredFunctionConfiguration, cron: Option<String>) -> Self {
        Self {
            version: INTERNAL_VERSION,
            cron,
            retry: RetryPolicy::resolve(config.retry.as_ref()),
            concurrency: config.concurrency,
            max_duration: config.max_duration,
        }
    }
}

/// Per-call options accumulated through the modifier chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOptions {
    /// Delay before the execution may start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<TimeSpec>,
    /// Tags attached to the execution
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: ExecutionMetadata,
    /// Deadline after which a pending execution is dropped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discard_after: Option<TimeSpec>,
}

impl ExecutionOptions {
    /// Copy with `delay` replaced.
    #[must_use]
    pub fn with_delay(&self, delay: TimeSpec) -> Self {
        Self {
            delay: Some(delay),
            ..self.clone()
        }
    }

    /// Copy with `tags` merged over the current metadata; new keys win.
    #[must_use]
    pub fn with_metadata(&self, tags: ExecutionMetadata) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.extend(tags);
        Self {
            metadata,
            ..self.clone()
        }
    }

    /// Copy with `discard_after` replaced.
    #[must_use]
    pub fn with_discard_after(&self, value: TimeSpec) -> Self {
        Self {
            discard_after: Some(value),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RETRY_MAX_ATTEMPTS_PLACEHOLDER;
    use serde_json::json;

    fn tags(pairs: &[(&str, &str)]) -> ExecutionMetadata {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_concurrency_range() {
        assert_eq!(Concurrency::new(0).unwrap().get(), 0);
        assert_eq!(Concurrency::new(50).unwrap().get(), 50);
        assert!(matches!(Concurrency::new(51), Err(CoreError::InvalidConfiguration(_))));
        assert!(serde_json::from_value::<Concurrency>(json!(51)).is_err());
    }

    #[test]
    fn test_manifest_from_configuration() {
        let config = DeferredFunctionConfiguration::default()
            .retry(true)
            .concurrency(Concurrency::new(10).unwrap())
            .max_duration(120);
        let manifest = Manifest::new(&config, Some("0 * * * *".to_string()));

        assert_eq!(manifest.version, INTERNAL_VERSION);
        assert_eq!(manifest.retry.max_attempts, RETRY_MAX_ATTEMPTS_PLACEHOLDER);
        assert_eq!(manifest.concurrency.map(Concurrency::get), Some(10));
        assert_eq!(manifest.max_duration, Some(120));
        assert_eq!(manifest.cron.as_deref(), Some("0 * * * *"));
    }

    #[test]
    fn test_configuration_from_value() {
        let config = DeferredFunctionConfiguration::from_value(json!({
            "retry": 4,
            "concurrency": 5,
            "maxDuration": 30
        }))
        .unwrap();
        assert_eq!(config.retry, Some(RetryConfig::Attempts(4)));
        assert_eq!(config.concurrency.map(Concurrency::get), Some(5));

        let err = DeferredFunctionConfiguration::from_value(json!({"retry": "always"})).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_metadata_merge_new_keys_win() {
        let base = ExecutionOptions::default().with_metadata(tags(&[("env", "dev"), ("team", "a")]));
        let merged = base.with_metadata(tags(&[("env", "prod")]));

        assert_eq!(merged.metadata, tags(&[("env", "prod"), ("team", "a")]));
        assert_eq!(base.metadata, tags(&[("env", "dev"), ("team", "a")]));
    }

    #[test]
    fn test_modifiers_replace_and_keep_other_fields() {
        let opts = ExecutionOptions::default()
            .with_metadata(tags(&[("env", "prod")]))
            .with_delay("1m".into())
            .with_delay("10m".into())
            .with_discard_after("1h".into());

        assert_eq!(opts.delay, Some(TimeSpec::from("10m")));
        assert_eq!(opts.discard_after, Some(TimeSpec::from("1h")));
        assert_eq!(opts.metadata, tags(&[("env", "prod")]));
    }
}
