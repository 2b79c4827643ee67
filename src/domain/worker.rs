//! Worker types.
//!
//! A worker is an ephemeral, resource-capped execution unit. Its input is a
//! [`TaskPayload`] built field by field by the requesting strategy; nothing
//! else from the agent crosses into the unit.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::{StrategyId, WorkerId};

/// Key fragments that never belong in a task payload.
const FORBIDDEN_KEY_FRAGMENTS: &[&str] = &[
    "key", "secret", "token", "password", "mnemonic", "seed", "private", "wallet",
];

/// Lifecycle status of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Starting,
    Running,
    Completed,
    Failed,
    Killed,
}

impl WorkerStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Killed)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Killed => "killed",
        };
        f.write_str(s)
    }
}

/// The only data handed to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub task_id: String,
    pub strategy_id: StrategyId,
    fields: BTreeMap<String, Value>,
}

impl TaskPayload {
    pub fn new(task_id: impl Into<String>, strategy_id: StrategyId) -> Self {
        Self {
            task_id: task_id.into(),
            strategy_id,
            fields: BTreeMap::new(),
        }
    }

    /// Add one explicitly chosen field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Reject field names that look like credentials or wallet material.
    pub fn validate(&self) -> Result<(), String> {
        for key in self.fields.keys() {
            let lowered = key.to_ascii_lowercase();
            if let Some(fragment) = FORBIDDEN_KEY_FRAGMENTS
                .iter()
                .find(|fragment| lowered.contains(**fragment))
            {
                return Err(format!(
                    "task field '{key}' looks like credential material ('{fragment}')"
                ));
            }
        }
        Ok(())
    }
}

/// Limits requested for one worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceRequest {
    /// Fraction of one CPU (e.g. 0.5).
    pub cpu_limit: f64,
    pub memory_limit_mb: u64,
    pub timeout: Duration,
}

impl ResourceRequest {
    /// Worker-minutes reserved for the full timeout.
    #[must_use]
    pub fn reserved_minutes(&self) -> Decimal {
        minutes(self.timeout)
    }
}

/// Snapshot of a tracked worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub spawned_at: DateTime<Utc>,
    pub cpu_limit: f64,
    pub memory_limit_mb: u64,
    pub task_payload: TaskPayload,
    pub status: WorkerStatus,
}

/// Final result collected from a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerOutcome {
    pub worker_id: WorkerId,
    pub status: WorkerStatus,
    pub result_payload: Value,
    pub minutes_used: Decimal,
    pub error: Option<String>,
}

impl WorkerOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == WorkerStatus::Completed
    }
}

/// Convert a duration to fractional minutes, rounded up to the second.
#[must_use]
pub fn minutes(duration: Duration) -> Decimal {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    Decimal::from(secs) / Decimal::from(60)
}
