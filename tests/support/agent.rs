use std::sync::Arc;
use std::time::Duration;

use agora::agent::{AgentParts, DecisionLoop, LoopSettings, StrategySelector};
use agora::audit::AuditGate;
use agora::budget::{BudgetLimits, ResourceBudgetTracker};
use agora::domain::{Amount, LedgerEntry, RawOpportunity, ResourceClass};
use agora::scanner::{RiskAdjustedScorer, ScanSettings, Scanner, SourceConnector, StaticSource};
use agora::strategy::{Strategy, StrategyRegistry};
use agora::treasury::{TreasuryLedger, TreasuryRules};
use agora::worker::{WorkerManager, WorkerSettings};
use rust_decimal_macros::dec;
use tokio::sync::watch;

use super::memory::RecordingMemory;
use super::runtime::ScriptedRuntime;
use super::selector::{Pick, ScriptedSelector};

/// Everything needed to build a decision loop, with test defaults.
pub struct AgentSetup {
    pub ledger: Arc<TreasuryLedger>,
    pub strategies: Vec<Arc<dyn Strategy>>,
    pub sources: Vec<Arc<dyn SourceConnector>>,
    pub selector: Arc<dyn StrategySelector>,
    pub gate: Arc<AuditGate>,
    pub runtime: Arc<ScriptedRuntime>,
    pub memory: Arc<RecordingMemory>,
    pub settings: LoopSettings,
}

impl AgentSetup {
    /// An in-memory ledger seeded with one deposit of `balance`.
    pub fn funded(balance: Amount) -> Self {
        let ledger = TreasuryLedger::in_memory();
        if balance > Amount::ZERO {
            ledger
                .record(LedgerEntry::transfer(balance, "seed"))
                .expect("seed deposit");
        }
        Self::with_ledger(Arc::new(ledger))
    }

    pub fn with_ledger(ledger: Arc<TreasuryLedger>) -> Self {
        Self {
            ledger,
            strategies: Vec::new(),
            sources: Vec::new(),
            selector: Arc::new(ScriptedSelector::new(Pick::Top)),
            gate: Arc::new(AuditGate::passive()),
            runtime: Arc::new(ScriptedRuntime::completing(serde_json::json!({}))),
            memory: Arc::new(RecordingMemory::default()),
            settings: LoopSettings {
                interval: Duration::from_millis(10),
                strategy_timeout: Duration::from_secs(5),
                max_cycles: None,
            },
        }
    }

    pub fn strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn records(mut self, name: &str, records: Vec<RawOpportunity>) -> Self {
        self.sources.push(Arc::new(StaticSource::new(name, records)));
        self
    }

    pub fn source(mut self, source: Arc<dyn SourceConnector>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn selector(mut self, selector: Arc<dyn StrategySelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn gate(mut self, gate: Arc<AuditGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn memory(mut self, memory: Arc<RecordingMemory>) -> Self {
        self.memory = memory;
        self
    }

    pub fn build(&self) -> DecisionLoop {
        self.build_with_shutdown(watch::channel(false).0)
    }

    pub fn build_with_shutdown(&self, shutdown: watch::Sender<bool>) -> DecisionLoop {
        let mut registry = StrategyRegistry::builder();
        for strategy in &self.strategies {
            registry
                .register(Arc::clone(strategy))
                .expect("unique strategy ids");
        }

        let mut scanner = Scanner::new(
            Arc::new(RiskAdjustedScorer::default()),
            ScanSettings::default(),
        );
        for source in &self.sources {
            scanner = scanner.with_source(Arc::clone(source));
        }

        let budget = ResourceBudgetTracker::new(
            BudgetLimits::new(chrono::Duration::days(1))
                .with_cap(ResourceClass::WorkerMinutes, dec!(600))
                .with_cap(ResourceClass::ConcurrentWorkers, dec!(2)),
        );
        let workers = Arc::new(WorkerManager::new(
            self.runtime.clone(),
            budget,
            Arc::clone(&self.gate),
            WorkerSettings::default(),
        ));

        DecisionLoop::new(
            AgentParts {
                ledger: Arc::clone(&self.ledger),
                rules: TreasuryRules::default(),
                scanner: Arc::new(scanner),
                registry: registry.build(),
                selector: Arc::clone(&self.selector),
                gate: Arc::clone(&self.gate),
                workers,
                memory: self.memory.clone(),
            },
            self.settings.clone(),
            shutdown,
        )
    }
}
