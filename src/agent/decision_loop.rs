//! The decision loop.
//!
//! One cycle walks `idle -> check_treasury -> scan_markets ->
//! rank_opportunities -> select_strategy -> execute_strategy ->
//! update_memory -> idle`, falling back to `idle` early when there is
//! nothing to do, the gate refuses, the halt switch is latched, or shutdown
//! is observed. Shutdown is checked at every state boundary and races every
//! suspension point (scan, selection, execution, approval).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::memory::{MemoryRecord, MemorySink};
use super::selector::{Selection, StrategySelector};
use super::state::{AgentState, HaltSwitch, LoopState};
use super::summary::{CycleDisposition, CycleSummary};
use crate::audit::{AuditAction, AuditGate, AuditMode, RiskLevel};
use crate::domain::{Amount, LedgerEntry, Opportunity, Outcome, ScoredOpportunity};
use crate::error::LedgerError;
use crate::scanner::Scanner;
use crate::strategy::{ExecutionContext, Strategy, StrategyRegistry};
use crate::treasury::{TreasuryLedger, TreasuryRules};
use crate::worker::WorkerManager;

/// Loop timing.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Pause between cycles.
    pub interval: Duration,
    /// Deadline for one strategy execution.
    pub strategy_timeout: Duration,
    /// Stop after this many cycles.
    pub max_cycles: Option<u64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            strategy_timeout: Duration::from_secs(600),
            max_cycles: None,
        }
    }
}

/// Collaborators the loop drives.
pub struct AgentParts {
    pub ledger: Arc<TreasuryLedger>,
    pub rules: TreasuryRules,
    pub scanner: Arc<Scanner>,
    pub registry: StrategyRegistry,
    pub selector: Arc<dyn StrategySelector>,
    pub gate: Arc<AuditGate>,
    pub workers: Arc<WorkerManager>,
    pub memory: Arc<dyn MemorySink>,
}

/// Operator handle to a running loop.
#[derive(Clone)]
pub struct AgentHandle {
    shutdown: Arc<watch::Sender<bool>>,
    halt: Arc<HaltSwitch>,
    cycles: Arc<AtomicU64>,
    gate: Arc<AuditGate>,
}

impl AgentHandle {
    /// Ask the loop to stop at the next boundary.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_halted()
    }

    pub fn halt_reason(&self) -> Option<String> {
        self.halt.reason()
    }

    /// Resume after an integrity halt.
    pub fn clear_halt(&self) {
        if self.halt.is_halted() {
            info!(reason = ?self.halt.reason(), "Halt cleared by operator");
        }
        self.halt.clear();
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn set_audit_mode(&self, mode: AuditMode) {
        self.gate.set_mode(mode);
    }
}

pub struct DecisionLoop {
    ledger: Arc<TreasuryLedger>,
    rules: TreasuryRules,
    scanner: Arc<Scanner>,
    registry: StrategyRegistry,
    selector: Arc<dyn StrategySelector>,
    gate: Arc<AuditGate>,
    workers: Arc<WorkerManager>,
    memory: Arc<dyn MemorySink>,
    settings: LoopSettings,
    state: Mutex<LoopState>,
    last: Mutex<AgentState>,
    cycles: Arc<AtomicU64>,
    halt: Arc<HaltSwitch>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown: watch::Receiver<bool>,
}

impl DecisionLoop {
    /// Build a loop. Setting `shutdown` to `true` stops it.
    pub fn new(parts: AgentParts, settings: LoopSettings, shutdown: watch::Sender<bool>) -> Self {
        let shutdown_rx = shutdown.subscribe();
        Self {
            ledger: parts.ledger,
            rules: parts.rules,
            scanner: parts.scanner,
            registry: parts.registry,
            selector: parts.selector,
            gate: parts.gate,
            workers: parts.workers,
            memory: parts.memory,
            settings,
            state: Mutex::new(LoopState::Idle),
            last: Mutex::new(AgentState::default()),
            cycles: Arc::new(AtomicU64::new(0)),
            halt: Arc::new(HaltSwitch::new()),
            shutdown_tx: Arc::new(shutdown),
            shutdown: shutdown_rx,
        }
    }

    #[must_use]
    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            shutdown: Arc::clone(&self.shutdown_tx),
            halt: Arc::clone(&self.halt),
            cycles: Arc::clone(&self.cycles),
            gate: Arc::clone(&self.gate),
        }
    }

    /// Completed traversals back to idle over the loop's lifetime.
    pub fn cycle_count(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LoopState {
        *self.state.lock()
    }

    /// Working memory of the most recent cycle.
    pub fn last_state(&self) -> AgentState {
        self.last.lock().clone()
    }

    pub fn ledger(&self) -> &Arc<TreasuryLedger> {
        &self.ledger
    }

    pub fn workers(&self) -> &Arc<WorkerManager> {
        &self.workers
    }

    /// Run cycles until shutdown or `max_cycles`, calling `on_cycle` after each.
    pub async fn run<F>(&self, mut on_cycle: F)
    where
        F: FnMut(&CycleSummary),
    {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            strategies = self.registry.len(),
            sources = self.scanner.source_count(),
            audit = %self.gate.mode(),
            "Decision loop started"
        );

        let mut attempted = 0u64;
        while !self.is_cancelled() {
            let summary = self.run_cycle().await;
            on_cycle(&summary);
            attempted += 1;

            if summary.disposition == CycleDisposition::Cancelled {
                break;
            }
            if self.settings.max_cycles.is_some_and(|max| attempted >= max) {
                info!(cycles = attempted, "Cycle limit reached");
                break;
            }
            if self
                .until_shutdown(tokio::time::sleep(self.settings.interval))
                .await
                .is_none()
            {
                break;
            }
        }

        info!(cycles = self.cycle_count(), "Decision loop stopped");
    }

    /// Run exactly one cycle and report it.
    pub async fn run_cycle(&self) -> CycleSummary {
        let started = Instant::now();
        let mut summary = CycleSummary::start(self.cycle_count(), self.ledger.balance());
        let mut state = AgentState::default();

        let disposition = self.traverse(&mut state, &mut summary).await;
        self.enter(LoopState::Idle);

        if !matches!(disposition, CycleDisposition::Halted | CycleDisposition::Cancelled) {
            summary.cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        }
        summary.disposition = disposition;
        summary.balance_after = self.ledger.balance();
        summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        *self.last.lock() = state;

        summary.log();
        summary
    }

    async fn traverse(&self, state: &mut AgentState, summary: &mut CycleSummary) -> CycleDisposition {
        if self.halt.is_halted() {
            summary.error = self.halt.reason();
            warn!(reason = ?summary.error, "Agent halted, skipping cycle");
            return CycleDisposition::Halted;
        }
        if self.is_cancelled() {
            return CycleDisposition::Cancelled;
        }

        self.enter(LoopState::CheckTreasury);
        let snapshot = self.ledger.snapshot();
        state.treasury_snapshot = Some(snapshot.clone());
        if self.is_cancelled() {
            return CycleDisposition::Cancelled;
        }

        self.enter(LoopState::ScanMarkets);
        let Some(report) = self.until_shutdown(self.scanner.scan(snapshot.balance)).await else {
            return CycleDisposition::Cancelled;
        };
        summary.opportunities = report.opportunities.len();
        summary.failed_sources = report.failed_sources.len();
        if self.is_cancelled() {
            return CycleDisposition::Cancelled;
        }

        self.enter(LoopState::RankOpportunities);
        state.ranked_opportunities = self.scanner.rank(report.opportunities);
        summary.top_score = state.ranked_opportunities.first().map(|s| s.score);
        if state.ranked_opportunities.is_empty() {
            debug!("Nothing to rank");
            return CycleDisposition::NoOpportunities;
        }
        if self.is_cancelled() {
            return CycleDisposition::Cancelled;
        }

        self.enter(LoopState::SelectStrategy);
        let picked = self.until_shutdown(self.selector.select(
            &snapshot,
            &state.ranked_opportunities,
            &self.registry,
        ));
        let Some(picked) = picked.await else {
            return CycleDisposition::Cancelled;
        };
        let Some(selection) = picked else {
            debug!("Selector declined");
            return CycleDisposition::Declined;
        };
        let (strategy, opportunity) = match self.resolve(&selection, &state.ranked_opportunities) {
            Ok(resolved) => resolved,
            Err(reason) => {
                warn!(reason = %reason, "Selection could not be resolved");
                summary.error = Some(reason);
                return CycleDisposition::Declined;
            }
        };
        summary.strategy_id = Some(strategy.id().clone());
        summary.opportunity = Some(opportunity.reference());
        state.selected_strategy = Some(strategy.id().clone());
        state.selected_opportunity = Some(opportunity.clone());

        let action = AuditAction::strategy(format!(
            "Execute {} on {}",
            strategy.id(),
            opportunity.reference()
        ))
        .detail("kind", opportunity.kind)
        .detail("title", &opportunity.title)
        .detail("estimated_return", opportunity.estimated_return)
        .detail("estimated_cost", opportunity.estimated_cost)
        .detail("balance", snapshot.balance)
        .risk(RiskLevel::Medium);
        if let Err(e) = self.gate.require(&action).await {
            summary.error = Some(e.to_string());
            return CycleDisposition::Denied;
        }
        if self.is_cancelled() {
            return CycleDisposition::Cancelled;
        }

        self.enter(LoopState::ExecuteStrategy);
        let ctx = ExecutionContext {
            spend_budget: self.rules.max_infra_budget(snapshot.balance),
            treasury: snapshot,
            workers: Arc::clone(&self.workers),
        };
        let outcome = self.execute(strategy.as_ref(), &opportunity, &ctx).await;
        let (ledger_delta, commit_error) = self.commit(&outcome, &opportunity).await;
        summary.worker_ids.clone_from(&outcome.worker_ids);
        summary.ledger_delta = ledger_delta;
        summary.error = commit_error.clone().or_else(|| outcome.error.clone());

        // Failures are remembered too.
        self.enter(LoopState::UpdateMemory);
        let record = MemoryRecord {
            recorded_at: Utc::now(),
            strategy_id: strategy.id().clone(),
            opportunity,
            outcome: outcome.clone(),
            ledger_delta,
        };
        if let Err(e) = self.memory.record_outcome(&record).await {
            warn!(error = %e, "Memory write failed");
        }

        let succeeded = outcome.success && commit_error.is_none();
        state.execution_outcome = Some(outcome);
        if succeeded {
            CycleDisposition::Executed
        } else {
            CycleDisposition::Failed
        }
    }

    fn resolve(
        &self,
        selection: &Selection,
        ranked: &[ScoredOpportunity],
    ) -> Result<(Arc<dyn Strategy>, Opportunity), String> {
        let strategy = self
            .registry
            .get(&selection.strategy_id)
            .map_err(|e| e.to_string())?;
        let opportunity = ranked
            .iter()
            .map(|s| &s.opportunity)
            .find(|o| o.reference() == selection.opportunity)
            .ok_or_else(|| format!("opportunity {} is not in this cycle's ranking", selection.opportunity))?;
        if !strategy.accepts(opportunity.kind) {
            return Err(format!(
                "strategy {} does not accept {} opportunities",
                strategy.id(),
                opportunity.kind
            ));
        }
        Ok((strategy, opportunity.clone()))
    }

    async fn execute(
        &self,
        strategy: &dyn Strategy,
        opportunity: &Opportunity,
        ctx: &ExecutionContext,
    ) -> Outcome {
        let id = strategy.id().clone();
        info!(strategy = %id, opportunity = %opportunity.reference(), "Executing strategy");

        let run = tokio::time::timeout(self.settings.strategy_timeout, strategy.execute(opportunity, ctx));
        match self.until_shutdown(run).await {
            Some(Ok(Ok(outcome))) => outcome,
            Some(Ok(Err(e))) => {
                warn!(strategy = %id, error = %e, "Strategy refused or errored");
                Outcome::failure(id, e.to_string())
            }
            Some(Err(_)) => {
                warn!(strategy = %id, "Strategy timed out");
                Outcome::failure(
                    id,
                    format!("timed out after {}s", self.settings.strategy_timeout.as_secs()),
                )
            }
            None => Outcome::failure(id, "cancelled by shutdown"),
        }
    }

    /// Book an outcome: income first, then costs as one expense.
    ///
    /// Returns the net amount committed and the first error, if any.
    async fn commit(&self, outcome: &Outcome, opportunity: &Opportunity) -> (Amount, Option<String>) {
        let reference = opportunity.reference().to_string();
        let mut delta = Amount::ZERO;

        if outcome.income > Amount::ZERO {
            let entry = LedgerEntry::income(outcome.income, outcome.strategy_id.clone(), &reference);
            match self.book(entry, RiskLevel::Low).await {
                Ok(amount) => delta += amount,
                Err(e) => return (delta, Some(e)),
            }
        }

        if outcome.costs > Amount::ZERO {
            if !self.ledger.can_afford(outcome.costs) {
                let e = LedgerError::InsufficientFunds {
                    balance: self.ledger.balance(),
                    debit: outcome.costs,
                };
                warn!(strategy = %outcome.strategy_id, error = %e, "Cannot book costs");
                return (delta, Some(e.to_string()));
            }
            let entry = LedgerEntry::expense(outcome.costs, Some(outcome.strategy_id.clone()), &reference);
            match self.book(entry, RiskLevel::Medium).await {
                Ok(amount) => delta += amount,
                Err(e) => return (delta, Some(e)),
            }
        }

        (delta, None)
    }

    async fn book(&self, entry: LedgerEntry, risk: RiskLevel) -> Result<Amount, String> {
        let action = AuditAction::transaction(format!("Record {} of {}", entry.category, entry.amount))
            .detail("amount", entry.amount)
            .detail("category", entry.category)
            .detail("reference", &entry.reference)
            .detail("balance", self.ledger.balance())
            .risk(risk);
        self.gate.require(&action).await.map_err(|e| e.to_string())?;

        match self.ledger.record(entry) {
            Ok(committed) => {
                info!(
                    category = %committed.category,
                    amount = %committed.amount,
                    balance = %self.ledger.balance(),
                    "Ledger entry committed"
                );
                Ok(committed.amount)
            }
            Err(LedgerError::Store(reason)) => {
                error!(reason = %reason, "Ledger persistence failed, halting");
                self.halt.trip(format!("ledger store failure: {reason}"));
                Err(LedgerError::Store(reason).to_string())
            }
            Err(e) => {
                warn!(error = %e, "Ledger rejected entry");
                Err(e.to_string())
            }
        }
    }

    fn enter(&self, next: LoopState) {
        let mut current = self.state.lock();
        debug_assert!(
            current.can_transition_to(next),
            "invalid loop transition {} -> {next}",
            *current
        );
        if *current != next {
            debug!(from = %*current, to = %next, "Loop transition");
        }
        *current = next;
    }

    fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Drive `fut` unless shutdown wins first.
    async fn until_shutdown<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = stopped(self.shutdown.clone()) => None,
            out = fut => Some(out),
        }
    }
}

/// Resolves once shutdown is signalled. A dropped sender never resolves.
async fn stopped(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_ok() {
        return;
    }
    std::future::pending::<()>().await;
}
