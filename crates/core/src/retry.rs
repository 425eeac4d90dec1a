//! Retry policy attached to a deferred function.
//!
//! Callers describe retries in one of several shapes (a flag, an attempt count or
//! a partial policy). [`RetryPolicy::resolve`] normalizes every shape into one
//! complete policy record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Attempt count used when retries are enabled without an explicit count.
pub const RETRY_MAX_ATTEMPTS_PLACEHOLDER: u32 = 13;

const DEFAULT_INITIAL_INTERVAL: u64 = 30;
const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
const DEFAULT_MULTIPLIER: f64 = 1.5;
const DEFAULT_MAX_INTERVAL: u64 = 60 * 10;

/// Complete retry policy, as sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Maximum number of attempts; 0 disables retries
    pub max_attempts: u32,
    /// First backoff interval, in seconds
    pub initial_interval: u64,
    /// Jitter applied to each interval
    pub randomization_factor: f64,
    /// Growth factor between intervals
    pub multiplier: f64,
    /// Upper bound of a single interval, in seconds
    pub max_interval: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            multiplier: DEFAULT_MULTIPLIER,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// Normalize an optional retry configuration into a complete policy.
    pub fn resolve(config: Option<&RetryConfig>) -> Self {
        let mut policy = Self::default();

        match config {
            None | Some(RetryConfig::Enabled(false)) => {}
            Some(RetryConfig::Enabled(true)) => {
                policy.max_attempts = RETRY_MAX_ATTEMPTS_PLACEHOLDER;
            }
            Some(RetryConfig::Attempts(attempts)) => {
                policy.max_attempts = *attempts;
            }
            Some(RetryConfig::Policy(partial)) => {
                policy.max_attempts = match partial.max_attempts {
                    Some(attempts) if attempts > 0 => attempts,
                    _ => RETRY_MAX_ATTEMPTS_PLACEHOLDER,
                };
                if let Some(v) = partial.initial_interval {
                    policy.initial_interval = v;
                }
                if let Some(v) = partial.randomization_factor {
                    policy.randomization_factor = v;
                }
                if let Some(v) = partial.multiplier {
                    policy.multiplier = v;
                }
                if let Some(v) = partial.max_interval {
                    policy.max_interval = v;
                }
            }
        }

        policy
    }

    /// Whether the backend should retry failed executions at all.
    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }
}

/// Retry policy with every field optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRetryPolicy {
    /// Maximum attempts; absent or 0 means the platform default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// First backoff interval, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_interval: Option<u64>,
    /// Jitter applied to each interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub randomization_factor: Option<f64>,
    /// Growth factor between intervals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    /// Upper bound of a single interval, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_interval: Option<u64>,
}

/// The accepted shapes of a retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "Value")]
pub enum RetryConfig {
    /// `true` enables retries with the platform default; `false` disables them
    Enabled(bool),
    /// Explicit attempt count
    Attempts(u32),
    /// Partial policy merged over the defaults
    Policy(PartialRetryPolicy),
}

impl RetryConfig {
    /// Parse a loosely typed configuration value; `null` means absent.
    pub fn from_value(value: Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            other => Self::try_from(other).map(Some),
        }
    }
}

impl TryFrom<Value> for RetryConfig {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(enabled) => Ok(Self::Enabled(enabled)),
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Self::Attempts)
                .ok_or_else(|| {
                    CoreError::invalid_configuration(format!(
                        "retry attempts must be a non-negative integer, got {n}"
                    ))
                }),
            Value::Object(_) => serde_json::from_value::<PartialRetryPolicy>(value)
                .map(Self::Policy)
                .map_err(|e| CoreError::invalid_configuration(format!("retry policy: {e}"))),
            other => Err(CoreError::invalid_configuration(format!(
                "unsupported retry option: {other}"
            ))),
        }
    }
}

impl From<bool> for RetryConfig {
    fn from(enabled: bool) -> Self {
        Self::Enabled(enabled)
    }
}

impl From<u32> for RetryConfig {
    fn from(attempts: u32) -> Self {
        Self::Attempts(attempts)
    }
}

impl From<PartialRetryPolicy> for RetryConfig {
    fn from(policy: PartialRetryPolicy) -> Self {
        Self::Policy(policy)
    }
}
