//! Decision loop states and per-cycle working memory.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::domain::{Opportunity, Outcome, ScoredOpportunity, StrategyId, TreasurySnapshot};

/// Named states of the decision loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    CheckTreasury,
    ScanMarkets,
    RankOpportunities,
    SelectStrategy,
    ExecuteStrategy,
    UpdateMemory,
}

impl LoopState {
    /// Whether `self -> next` is an edge of the loop.
    ///
    /// Any state may fall back to `Idle` (cancellation, halt, decline).
    #[must_use]
    pub const fn can_transition_to(self, next: LoopState) -> bool {
        use LoopState::*;
        matches!(
            (self, next),
            (_, Idle)
                | (Idle, CheckTreasury)
                | (CheckTreasury, ScanMarkets)
                | (ScanMarkets, RankOpportunities)
                | (RankOpportunities, SelectStrategy)
                | (SelectStrategy, ExecuteStrategy)
                | (ExecuteStrategy, UpdateMemory)
        )
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CheckTreasury => "check_treasury",
            Self::ScanMarkets => "scan_markets",
            Self::RankOpportunities => "rank_opportunities",
            Self::SelectStrategy => "select_strategy",
            Self::ExecuteStrategy => "execute_strategy",
            Self::UpdateMemory => "update_memory",
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Working memory for one cycle. Rebuilt every cycle.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub treasury_snapshot: Option<TreasurySnapshot>,
    pub ranked_opportunities: Vec<ScoredOpportunity>,
    pub selected_strategy: Option<StrategyId>,
    pub selected_opportunity: Option<Opportunity>,
    pub execution_outcome: Option<Outcome>,
}

/// Latched stop switch for integrity failures.
///
/// Once tripped, the loop takes no action until an operator clears it.
#[derive(Debug, Default)]
pub struct HaltSwitch {
    halted: AtomicBool,
    reason: RwLock<Option<String>>,
}

impl HaltSwitch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Trip the switch. The first reason wins until cleared.
    pub fn trip(&self, reason: impl Into<String>) {
        let mut current = self.reason.write();
        if current.is_none() {
            *current = Some(reason.into());
        }
        self.halted.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        let mut current = self.reason.write();
        *current = None;
        self.halted.store(false, Ordering::SeqCst);
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_edges_follow_the_cycle() {
        use LoopState::*;
        let path = [
            Idle,
            CheckTreasury,
            ScanMarkets,
            RankOpportunities,
            SelectStrategy,
            ExecuteStrategy,
            UpdateMemory,
            Idle,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(!LoopState::Idle.can_transition_to(LoopState::ExecuteStrategy));
        assert!(!LoopState::ScanMarkets.can_transition_to(LoopState::SelectStrategy));
        assert!(!LoopState::SelectStrategy.can_transition_to(LoopState::UpdateMemory));
        assert!(LoopState::RankOpportunities.can_transition_to(LoopState::Idle));
    }

    #[test]
    fn halt_switch_latches_first_reason() {
        let halt = HaltSwitch::new();
        assert!(!halt.is_halted());

        halt.trip("ledger store failure");
        halt.trip("second");
        assert!(halt.is_halted());
        assert_eq!(halt.reason().as_deref(), Some("ledger store failure"));

        halt.clear();
        assert!(!halt.is_halted());
        assert!(halt.reason().is_none());
    }
}
