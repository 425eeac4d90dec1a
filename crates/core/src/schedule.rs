//! Resolution of schedule values into absolute instants.
//!
//! A [`TimeSpec`] is either an absolute instant or a duration string relative to
//! the moment of resolution. Relative values are always resolved against a
//! reference instant captured by the caller at call time, never at definition
//! time.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::Time;

/// An absolute instant or a relative duration such as `"10m"` or `"1h30m"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeSpec {
    /// Absolute instant
    At(Time),
    /// Duration string, resolved relative to a reference instant
    Relative(String),
}

impl TimeSpec {
    /// Resolve into an absolute instant using `now` as the reference.
    pub fn resolve(&self, now: Time) -> Result<Time> {
        match self {
            TimeSpec::At(at) => Ok(*at),
            TimeSpec::Relative(value) => {
                let offset = parse_offset(value)?;
                now.checked_add_signed(offset).ok_or_else(|| CoreError::InvalidDuration {
                    value: value.clone(),
                    reason: "resolved instant is out of range".to_string(),
                })
            }
        }
    }

    /// Whether this value depends on the moment it is resolved.
    pub fn is_relative(&self) -> bool {
        matches!(self, TimeSpec::Relative(_))
    }
}

/// Resolve an optional value, falling back to `now` when absent.
pub fn resolve_or_now(spec: Option<&TimeSpec>, now: Time) -> Result<Time> {
    match spec {
        Some(spec) => spec.resolve(now),
        None => Ok(now),
    }
}

/// Parse a duration string into a millisecond-precision offset.
fn parse_offset(value: &str) -> Result<chrono::Duration> {
    let parsed = humantime::parse_duration(value).map_err(|e| CoreError::InvalidDuration {
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    i64::try_from(parsed.as_millis())
        .map(chrono::Duration::milliseconds)
        .map_err(|_| CoreError::InvalidDuration {
            value: value.to_string(),
            reason: "duration is too large".to_string(),
        })
}

impl From<Time> for TimeSpec {
    fn from(at: Time) -> Self {
        TimeSpec::At(at)
    }
}

impl From<&str> for TimeSpec {
    fn from(value: &str) -> Self {
        TimeSpec::Relative(value.to_string())
    }
}

impl From<String> for TimeSpec {
    fn from(value: String) -> Self {
        TimeSpec::Relative(value)
    }
}

impl From<std::time::Duration> for TimeSpec {
    fn from(value: std::time::Duration) -> Self {
        TimeSpec::Relative(humantime::format_duration(value).to_string())
    }
}

impl std::fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeSpec::At(at) => write!(f, "{}", at.to_rfc3339()),
            TimeSpec::Relative(value) => write!(f, "in {value}"),
        }
    }
}
