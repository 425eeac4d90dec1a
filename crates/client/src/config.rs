//! Configuration for the backend transport.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use crate::error::{ClientError, Result};

/// Environment variable holding the backend credential.
pub const TOKEN_ENV: &str = "DEFER_TOKEN";

/// Environment variable overriding the backend endpoint.
pub const ENDPOINT_ENV: &str = "DEFER_ENDPOINT";

/// Endpoint used when no override is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.defer.run";

/// Configuration of the backend client.
///
/// A configured `token` is what selects remote mode; without it every call runs
/// in-process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend credential.
    #[serde(default)]
    pub token: Option<String>,

    /// Backend base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Timeout for a single HTTP request.
    #[serde(with = "duration_millis", default = "default_timeout")]
    pub timeout: Duration,

    /// Interval between polls while waiting for a result.
    #[serde(with = "duration_millis", default = "default_poll_interval")]
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            endpoint: default_endpoint(),
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl ClientConfig {
    /// Create a config for the default endpoint with the given credential.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Load configuration from `DEFER_TOKEN` and `DEFER_ENDPOINT`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var(TOKEN_ENV).ok(),
            std::env::var(ENDPOINT_ENV).ok(),
        )
    }

    /// Build a config from raw variable values; empty values count as unset.
    pub fn from_vars(token: Option<String>, endpoint: Option<String>) -> Result<Self> {
        let mut config = Self {
            token: token.filter(|t| !t.is_empty()),
            ..Default::default()
        };

        if let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) {
            config.endpoint = endpoint;
        }

        config.endpoint_url()?;
        Ok(config)
    }

    /// Set the endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Parse the configured endpoint.
    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).map_err(|e| {
            ClientError::config(format!("invalid endpoint '{}': {e}", self.endpoint))
        })
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the polling interval used while waiting for results.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether a credential is configured.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

/// Serialization helper for Duration as milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
