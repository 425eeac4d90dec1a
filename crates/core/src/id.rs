//! Execution identifiers.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque identifier of one execution.
///
/// Remote ids are whatever the backend hands out; local ids are freshly
/// generated ULIDs and are never reissued within a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Generate a fresh local identifier.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Wrap an identifier received from elsewhere (backend response, CLI input).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ExecutionId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ExecutionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ExecutionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| ExecutionId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = ExecutionId::new("01HZX");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("01HZX"));
    }
}
