//! Revenue strategies.
//!
//! A [`Strategy`] turns one opportunity into an [`Outcome`]. Strategies are
//! collected once at startup into an immutable [`StrategyRegistry`].
//!
//! # Built-in strategies
//!
//! - [`TradeStrategy`] - deploys capital into a yield pool
//! - [`ArbitrageStrategy`] - captures a quoted price gap
//! - [`FreelanceStrategy`] - completes a task in a worker
//! - [`ContentStrategy`] - writes an article in a worker

mod arbitrage;
mod content;
mod freelance;
mod registry;
mod task;
mod trade;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Amount, Opportunity, OpportunityKind, Outcome, StrategyId, TreasurySnapshot};
use crate::error::Result;
use crate::worker::WorkerManager;

pub use arbitrage::{ArbitrageConfig, ArbitrageStrategy};
pub use content::{ContentConfig, ContentStrategy};
pub use freelance::{FreelanceConfig, FreelanceStrategy};
pub use registry::{StrategyRegistry, StrategyRegistryBuilder};
pub use trade::{TradeConfig, TradeStrategy};

/// What a strategy may use while executing.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Treasury state at the start of the cycle.
    pub treasury: TreasurySnapshot,
    /// Upper bound on infrastructure spend for this execution.
    pub spend_budget: Amount,
    pub workers: Arc<WorkerManager>,
}

/// A named revenue capability.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Unique identifier.
    fn id(&self) -> &StrategyId;

    /// Short human description.
    fn description(&self) -> &'static str;

    /// Opportunity kinds this strategy can execute.
    fn accepted_kinds(&self) -> &[OpportunityKind];

    /// Minimum treasury balance needed to run.
    fn min_capital(&self) -> Amount;

    fn accepts(&self, kind: OpportunityKind) -> bool {
        self.accepted_kinds().contains(&kind)
    }

    fn can_run(&self, balance: Amount) -> bool {
        balance >= self.min_capital()
    }

    /// Execute against `opportunity`.
    ///
    /// Expected failures (bad payload, worker failure) come back as a failed
    /// [`Outcome`]; `Err` is reserved for refusals such as an audit denial.
    async fn execute(&self, opportunity: &Opportunity, ctx: &ExecutionContext) -> Result<Outcome>;
}
