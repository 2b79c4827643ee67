//! Opportunity types.
//!
//! Source connectors return [`RawOpportunity`] records (plain JSON). The
//! scanner normalizes them into [`Opportunity`] values, and the scorer wraps
//! them into [`ScoredOpportunity`] once ranked. None of these outlive the
//! cycle that discovered them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::OpportunityId;
use super::money::Amount;
use crate::error::SourceError;

/// Kind of revenue action an opportunity calls for.
///
/// Every kind is served by at least one registered strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityKind {
    Trade,
    Freelance,
    Arbitrage,
    Content,
}

impl OpportunityKind {
    /// All known kinds, in declaration order.
    pub const ALL: [OpportunityKind; 4] = [
        OpportunityKind::Trade,
        OpportunityKind::Freelance,
        OpportunityKind::Arbitrage,
        OpportunityKind::Content,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trade => "trade",
            Self::Freelance => "freelance",
            Self::Arbitrage => "arbitrage",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpportunityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown opportunity kind '{s}'"))
    }
}

/// A candidate revenue-generating action discovered from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub source_id: String,
    pub kind: OpportunityKind,
    pub title: String,
    pub description: String,
    /// Source-specific data passed through to the executing strategy.
    pub raw_payload: Value,
    /// Expected gross return in currency units.
    pub estimated_return: Amount,
    /// Risk estimate, higher is riskier (sources use a 1-10 scale).
    pub estimated_risk: f64,
    /// Capital the action ties up or spends up front.
    pub estimated_cost: Amount,
    pub discovered_at: DateTime<Utc>,
}

impl Opportunity {
    /// Create an opportunity with an empty payload, discovered now.
    pub fn new(
        source_id: impl Into<String>,
        id: impl Into<OpportunityId>,
        kind: OpportunityKind,
        estimated_return: Amount,
        estimated_risk: f64,
    ) -> Self {
        let id = id.into();
        Self {
            title: id.to_string(),
            id,
            source_id: source_id.into(),
            kind,
            description: String::new(),
            raw_payload: Value::Null,
            estimated_return,
            estimated_risk,
            estimated_cost: Decimal::ZERO,
            discovered_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.raw_payload = payload;
        self
    }

    #[must_use]
    pub fn with_cost(mut self, cost: Amount) -> Self {
        self.estimated_cost = cost;
        self
    }

    #[must_use]
    pub fn discovered_at(mut self, at: DateTime<Utc>) -> Self {
        self.discovered_at = at;
        self
    }

    /// Reference used by the selection boundary to point at this record.
    #[must_use]
    pub fn reference(&self) -> OpportunityRef {
        OpportunityRef {
            source_id: self.source_id.clone(),
            id: self.id.clone(),
        }
    }

    /// Look up a string field in the raw payload.
    #[must_use]
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.raw_payload.get(key).and_then(Value::as_str)
    }

    /// Look up a numeric field in the raw payload.
    #[must_use]
    pub fn payload_f64(&self, key: &str) -> Option<f64> {
        self.raw_payload.get(key).and_then(Value::as_f64)
    }
}

/// Stable pointer to an opportunity within one cycle's ranking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpportunityRef {
    pub source_id: String,
    pub id: OpportunityId,
}

impl fmt::Display for OpportunityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_id, self.id)
    }
}

/// An opportunity with its risk-adjusted score and 1-based rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredOpportunity {
    pub opportunity: Opportunity,
    pub score: f64,
    pub rank: usize,
}

/// Connector output before normalization.
///
/// Unknown fields are ignored; `payload` is passed through untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawOpportunity {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payload: Value,
    pub estimated_return: Decimal,
    #[serde(default = "default_risk")]
    pub estimated_risk: f64,
    #[serde(default)]
    pub estimated_cost: Decimal,
    #[serde(default)]
    pub discovered_at: Option<DateTime<Utc>>,
}

fn default_risk() -> f64 {
    5.0
}

impl RawOpportunity {
    /// Check the kind and risk without consuming the record.
    pub fn validate(&self, source_id: &str) -> Result<OpportunityKind, SourceError> {
        let kind = self
            .kind
            .parse::<OpportunityKind>()
            .map_err(|reason| SourceError::Malformed {
                source_id: source_id.to_string(),
                reason,
            })?;
        if !self.estimated_risk.is_finite() || self.estimated_risk < 0.0 {
            return Err(SourceError::Malformed {
                source_id: source_id.to_string(),
                reason: format!("invalid risk {} for '{}'", self.estimated_risk, self.id),
            });
        }
        Ok(kind)
    }

    /// Normalize into an [`Opportunity`] attributed to `source_id`.
    ///
    /// Records without an explicit discovery time are stamped with `now`.
    pub fn normalize(self, source_id: &str, now: DateTime<Utc>) -> Result<Opportunity, SourceError> {
        let kind = self.validate(source_id)?;
        let title = if self.title.is_empty() {
            self.id.clone()
        } else {
            self.title
        };
        Ok(Opportunity {
            id: OpportunityId::new(self.id),
            source_id: source_id.to_string(),
            kind,
            title,
            description: self.description,
            raw_payload: self.payload,
            estimated_return: self.estimated_return,
            estimated_risk: self.estimated_risk,
            estimated_cost: self.estimated_cost,
            discovered_at: self.discovered_at.unwrap_or(now),
        })
    }
}
