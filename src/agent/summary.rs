use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Amount, OpportunityRef, StrategyId, WorkerId};

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleDisposition {
    /// A strategy ran and succeeded.
    Executed,
    /// A strategy ran and failed; the failure was recorded.
    Failed,
    /// Scan produced nothing to rank.
    NoOpportunities,
    /// The selector declined, or its pick could not be resolved.
    Declined,
    /// The audit gate refused execution.
    Denied,
    /// The halt switch is latched; nothing was attempted.
    Halted,
    /// Shutdown was observed mid-cycle.
    Cancelled,
}

impl CycleDisposition {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::NoOpportunities => "no_opportunities",
            Self::Declined => "declined",
            Self::Denied => "denied",
            Self::Halted => "halted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CycleDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured record of one cycle, logged and published to the status file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Cycle number after this cycle (unchanged for halted/cancelled cycles).
    pub cycle: u64,
    pub disposition: CycleDisposition,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub opportunities: usize,
    pub failed_sources: usize,
    pub top_score: Option<f64>,
    pub strategy_id: Option<StrategyId>,
    pub opportunity: Option<OpportunityRef>,
    /// Net amount committed to the ledger this cycle.
    pub ledger_delta: Amount,
    pub worker_ids: Vec<WorkerId>,
    pub error: Option<String>,
}

impl CycleSummary {
    pub(crate) fn start(cycle: u64, balance: Amount) -> Self {
        Self {
            cycle,
            disposition: CycleDisposition::Declined,
            started_at: Utc::now(),
            duration_ms: 0,
            balance_before: balance,
            balance_after: balance,
            opportunities: 0,
            failed_sources: 0,
            top_score: None,
            strategy_id: None,
            opportunity: None,
            ledger_delta: Amount::ZERO,
            worker_ids: Vec::new(),
            error: None,
        }
    }

    /// Emit the one-line cycle record.
    pub fn log(&self) {
        info!(
            cycle = self.cycle,
            disposition = %self.disposition,
            duration_ms = self.duration_ms,
            balance_before = %self.balance_before,
            balance_after = %self.balance_after,
            opportunities = self.opportunities,
            failed_sources = self.failed_sources,
            top_score = ?self.top_score,
            strategy = ?self.strategy_id.as_ref().map(StrategyId::as_str),
            opportunity = ?self.opportunity.as_ref().map(ToString::to_string),
            ledger_delta = %self.ledger_delta,
            workers = self.worker_ids.len(),
            error = ?self.error,
            "Cycle complete"
        );
    }
}
