//! Actions presented to the operator.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operating mode of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    /// Every action proceeds immediately.
    #[default]
    Passive,
    /// Every irreversible action waits for explicit approval.
    Audit,
}

impl fmt::Display for AuditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passive => f.write_str("passive"),
            Self::Audit => f.write_str("audit"),
        }
    }
}

impl FromStr for AuditMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passive" | "false" | "0" | "off" => Ok(Self::Passive),
            "audit" | "true" | "1" | "on" => Ok(Self::Audit),
            other => Err(format!("unknown audit mode '{other}'")),
        }
    }
}

/// What kind of irreversible effect an action has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Ledger mutation.
    Transaction,
    /// Worker spawn.
    Worker,
    /// Strategy execution.
    Strategy,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transaction => "transaction",
            Self::Worker => "worker",
            Self::Strategy => "strategy",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// A proposed action awaiting authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditAction {
    pub kind: ActionKind,
    /// One-line human summary.
    pub title: String,
    pub details: BTreeMap<String, String>,
    pub risk: RiskLevel,
}

impl AuditAction {
    pub fn new(kind: ActionKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            details: BTreeMap::new(),
            risk: RiskLevel::default(),
        }
    }

    pub fn transaction(title: impl Into<String>) -> Self {
        Self::new(ActionKind::Transaction, title)
    }

    pub fn worker(title: impl Into<String>) -> Self {
        Self::new(ActionKind::Worker, title)
    }

    pub fn strategy(title: impl Into<String>) -> Self {
        Self::new(ActionKind::Strategy, title)
    }

    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    #[must_use]
    pub fn risk(mut self, risk: RiskLevel) -> Self {
        self.risk = risk;
        self
    }
}

/// Result of an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditDecision {
    Approved,
    Denied,
    /// No answer within the configured timeout. Treated as denied.
    Timeout,
}

impl AuditDecision {
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for AuditDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Timeout => "timeout",
        };
        f.write_str(s)
    }
}
