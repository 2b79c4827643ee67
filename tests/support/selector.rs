use std::sync::atomic::{AtomicUsize, Ordering};

use agora::agent::{Selection, StrategySelector};
use agora::domain::{ScoredOpportunity, TreasurySnapshot};
use agora::strategy::StrategyRegistry;
use async_trait::async_trait;
use parking_lot::Mutex;

/// What a [`ScriptedSelector`] answers.
#[derive(Debug, Clone)]
pub enum Pick {
    /// Decline every time.
    Decline,
    /// Always return this selection.
    Fixed(Selection),
    /// Pick the top-ranked opportunity with the first strategy accepting it.
    Top,
}

/// Selector with a scripted answer that records what it was shown.
pub struct ScriptedSelector {
    pick: Pick,
    calls: AtomicUsize,
    seen_scores: Mutex<Vec<Vec<f64>>>,
}

impl ScriptedSelector {
    pub fn new(pick: Pick) -> Self {
        Self {
            pick,
            calls: AtomicUsize::new(0),
            seen_scores: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Scores of the ranking passed on each call, in rank order.
    pub fn seen_scores(&self) -> Vec<Vec<f64>> {
        self.seen_scores.lock().clone()
    }
}

#[async_trait]
impl StrategySelector for ScriptedSelector {
    async fn select(
        &self,
        _treasury: &TreasurySnapshot,
        ranked: &[ScoredOpportunity],
        registry: &StrategyRegistry,
    ) -> Option<Selection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_scores
            .lock()
            .push(ranked.iter().map(|s| s.score).collect());

        match &self.pick {
            Pick::Decline => None,
            Pick::Fixed(selection) => Some(selection.clone()),
            Pick::Top => {
                let top = ranked.first()?;
                let strategy = registry.for_kind(top.opportunity.kind).next()?;
                Some(Selection {
                    strategy_id: strategy.id().clone(),
                    opportunity: top.opportunity.reference(),
                })
            }
        }
    }
}
