//! Strategy execution outcome.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::{StrategyId, WorkerId};
use super::money::Amount;

/// Result of executing one strategy against one opportunity.
///
/// Failures are outcomes too: `success == false` with `error` set and no
/// income. Costs actually incurred before the failure are still reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub strategy_id: StrategyId,
    pub success: bool,
    /// Gross revenue to book as income.
    pub income: Amount,
    /// Spend to book as a single expense.
    pub costs: Amount,
    /// Strategy-specific details for memory and audit.
    pub details: Value,
    pub worker_ids: Vec<WorkerId>,
    pub error: Option<String>,
}

impl Outcome {
    /// A successful outcome with no spend.
    pub fn success(strategy_id: StrategyId, income: Amount) -> Self {
        Self {
            strategy_id,
            success: true,
            income,
            costs: Amount::ZERO,
            details: Value::Null,
            worker_ids: Vec::new(),
            error: None,
        }
    }

    /// A failed outcome with no income.
    pub fn failure(strategy_id: StrategyId, error: impl Into<String>) -> Self {
        Self {
            strategy_id,
            success: false,
            income: Amount::ZERO,
            costs: Amount::ZERO,
            details: Value::Null,
            worker_ids: Vec::new(),
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn with_costs(mut self, costs: Amount) -> Self {
        self.costs = costs;
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn with_worker(mut self, worker_id: WorkerId) -> Self {
        self.worker_ids.push(worker_id);
        self
    }

    /// Net treasury effect: income minus costs.
    #[must_use]
    pub fn ledger_delta(&self) -> Amount {
        self.income - self.costs
    }
}
