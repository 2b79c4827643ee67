//! Outcome memory boundary.
//!
//! Writes are fire-and-forget from the loop's side: a failed write is
//! logged and never touches the ledger.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Amount, Opportunity, Outcome, StrategyId};
use crate::error::{Error, Result};

/// One executed cycle, as remembered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub recorded_at: DateTime<Utc>,
    pub strategy_id: StrategyId,
    pub opportunity: Opportunity,
    pub outcome: Outcome,
    /// Net amount actually committed to the ledger.
    pub ledger_delta: Amount,
}

#[async_trait]
pub trait MemorySink: Send + Sync {
    async fn record_outcome(&self, record: &MemoryRecord) -> Result<()>;
}

/// Logs each record and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMemorySink;

#[async_trait]
impl MemorySink for TracingMemorySink {
    async fn record_outcome(&self, record: &MemoryRecord) -> Result<()> {
        info!(
            strategy = %record.strategy_id,
            opportunity = %record.opportunity.reference(),
            success = record.outcome.success,
            ledger_delta = %record.ledger_delta,
            "Outcome recorded"
        );
        Ok(())
    }
}

/// Append-only JSON-lines episode log.
pub struct JsonlMemorySink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlMemorySink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Read every stored record, oldest first.
    pub fn read_all(&self) -> Result<Vec<MemoryRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<MemoryRecord>(line).map_err(Error::from))
            .collect()
    }
}

#[async_trait]
impl MemorySink for JsonlMemorySink {
    async fn record_outcome(&self, record: &MemoryRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
