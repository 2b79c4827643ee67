//! Strategy selection boundary.
//!
//! The loop hands ranked opportunities to a [`StrategySelector`] and acts
//! on whatever it returns. A language-model backed selector plugs in here;
//! [`TopRankedSelector`] is the deterministic built-in.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{OpportunityRef, ScoredOpportunity, StrategyId, TreasurySnapshot};
use crate::strategy::StrategyRegistry;

/// A selector's pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub strategy_id: StrategyId,
    pub opportunity: OpportunityRef,
}

/// Picks a strategy and opportunity, or declines by returning `None`.
#[async_trait]
pub trait StrategySelector: Send + Sync {
    async fn select(
        &self,
        treasury: &TreasurySnapshot,
        ranked: &[ScoredOpportunity],
        registry: &StrategyRegistry,
    ) -> Option<Selection>;
}

/// Highest-ranked opportunity above `min_score` that some registered
/// strategy accepts and can afford to run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopRankedSelector {
    pub min_score: f64,
}

impl TopRankedSelector {
    #[must_use]
    pub fn new(min_score: f64) -> Self {
        Self { min_score }
    }
}

impl Default for TopRankedSelector {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[async_trait]
impl StrategySelector for TopRankedSelector {
    async fn select(
        &self,
        treasury: &TreasurySnapshot,
        ranked: &[ScoredOpportunity],
        registry: &StrategyRegistry,
    ) -> Option<Selection> {
        for scored in ranked {
            if scored.score < self.min_score {
                debug!(score = scored.score, min_score = self.min_score, "Below minimum score");
                break;
            }
            let opportunity = &scored.opportunity;
            if let Some(strategy) = registry
                .for_kind(opportunity.kind)
                .find(|s| s.can_run(treasury.balance))
            {
                return Some(Selection {
                    strategy_id: strategy.id().clone(),
                    opportunity: opportunity.reference(),
                });
            }
            debug!(
                opportunity = %opportunity.reference(),
                kind = %opportunity.kind,
                "No runnable strategy for opportunity"
            );
        }
        None
    }
}
