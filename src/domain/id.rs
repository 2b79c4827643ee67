//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strategy identifier - newtype for type safety.
///
/// The inner String is private to ensure all construction goes through
/// the defined constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(String);

impl StrategyId {
    /// Create a new `StrategyId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the strategy ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StrategyId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for StrategyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opportunity identifier, unique within one source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpportunityId(String);

impl OpportunityId {
    /// Create a new `OpportunityId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the opportunity ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OpportunityId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for OpportunityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Worker identifier.
///
/// Generated by the worker manager at spawn time; never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    /// Generate a fresh worker ID.
    #[must_use]
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self(format!("w-{}", &uuid[..12]))
    }

    /// Create a `WorkerId` from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the worker ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_id_new_and_as_str() {
        let id = StrategyId::new("trade");
        assert_eq!(id.as_str(), "trade");
    }

    #[test]
    fn strategy_id_from_str() {
        let id = StrategyId::from("content");
        assert_eq!(format!("{id}"), "content");
    }

    #[test]
    fn opportunity_id_from_string() {
        let id = OpportunityId::from("defi:pool-1".to_string());
        assert_eq!(id.as_str(), "defi:pool-1");
    }

    #[test]
    fn worker_ids_are_unique() {
        let a = WorkerId::generate();
        let b = WorkerId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("w-"));
    }

    #[test]
    fn strategy_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&StrategyId::new("trade")).unwrap();
        assert_eq!(json, "\"trade\"");
    }
}
