use std::sync::atomic::{AtomicUsize, Ordering};

use agora::domain::{Amount, Opportunity, OpportunityKind, Outcome, StrategyId};
use agora::error::Result;
use agora::strategy::{ExecutionContext, Strategy};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Strategy returning a fixed outcome and counting executions.
pub struct FixedStrategy {
    id: StrategyId,
    kinds: Vec<OpportunityKind>,
    income: Amount,
    costs: Amount,
    success: bool,
    executions: AtomicUsize,
}

impl FixedStrategy {
    pub fn earning(id: &str, kind: OpportunityKind, income: Amount) -> Self {
        Self {
            id: StrategyId::new(id),
            kinds: vec![kind],
            income,
            costs: Decimal::ZERO,
            success: true,
            executions: AtomicUsize::new(0),
        }
    }

    pub fn failing(id: &str, kind: OpportunityKind, costs: Amount) -> Self {
        Self {
            id: StrategyId::new(id),
            kinds: vec![kind],
            income: Decimal::ZERO,
            costs,
            success: false,
            executions: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_costs(mut self, costs: Amount) -> Self {
        self.costs = costs;
        self
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Strategy for FixedStrategy {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn description(&self) -> &'static str {
        "fixed outcome"
    }

    fn accepted_kinds(&self) -> &[OpportunityKind] {
        &self.kinds
    }

    fn min_capital(&self) -> Amount {
        Decimal::ZERO
    }

    async fn execute(&self, _opportunity: &Opportunity, _ctx: &ExecutionContext) -> Result<Outcome> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let outcome = if self.success {
            Outcome::success(self.id.clone(), self.income)
        } else {
            Outcome::failure(self.id.clone(), "scripted failure")
        };
        Ok(outcome.with_costs(self.costs))
    }
}

/// Strategy that never finishes on its own.
pub struct StalledStrategy {
    id: StrategyId,
    kinds: Vec<OpportunityKind>,
}

impl StalledStrategy {
    pub fn new(id: &str, kind: OpportunityKind) -> Self {
        Self {
            id: StrategyId::new(id),
            kinds: vec![kind],
        }
    }
}

#[async_trait]
impl Strategy for StalledStrategy {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn description(&self) -> &'static str {
        "never finishes"
    }

    fn accepted_kinds(&self) -> &[OpportunityKind] {
        &self.kinds
    }

    fn min_capital(&self) -> Amount {
        Decimal::ZERO
    }

    async fn execute(&self, _opportunity: &Opportunity, _ctx: &ExecutionContext) -> Result<Outcome> {
        std::future::pending().await
    }
}
