//! Application layer: wiring configuration into a running agent.

mod builder;
pub mod status_file;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::agent::{AgentHandle, AgentParts, CycleSummary, DecisionLoop, LoopSettings};
use crate::budget::ResourceBudgetTracker;
use crate::config::Config;
use crate::error::Result;
use crate::worker::{ProcessRuntime, WorkerManager};

pub use builder::{build_source, build_strategy_registry, open_ledger};
pub use status_file::{StatusConfig, StatusFile, StatusRuntime, StatusWriter};

/// A fully wired agent ready to run.
pub struct App {
    agent: DecisionLoop,
    status: Option<StatusWriter>,
}

impl App {
    /// Build every collaborator from `config`. `max_cycles` bounds the run.
    #[allow(clippy::result_large_err)]
    pub fn build(config: &Config, max_cycles: Option<u64>) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ledger = Arc::new(builder::ledger_for(config)?);
        let registry = builder::build_strategy_registry(&config.strategies)?;
        let scanner = Arc::new(builder::build_scanner(
            &config.scanner,
            config.scoring.into(),
        )?);
        let gate = Arc::new(builder::build_gate(config, shutdown_rx)?);

        let runtime = Arc::new(ProcessRuntime::new(
            config.worker.program.clone(),
            config.worker.args.clone(),
        ));
        let budget = ResourceBudgetTracker::new((&config.budget).into());
        let workers = Arc::new(WorkerManager::new(
            runtime,
            budget,
            Arc::clone(&gate),
            (&config.worker).into(),
        ));

        info!(
            strategies = ?registry.ids().iter().map(ToString::to_string).collect::<Vec<_>>(),
            sources = scanner.source_count(),
            balance = %ledger.balance(),
            audit = %gate.mode(),
            dry_run = config.dry_run,
            "Agent assembled"
        );

        let status = config.agent.status_file.clone().map(|path| {
            StatusWriter::new(
                path,
                StatusConfig {
                    strategies: config.strategies.enabled.clone(),
                    audit_mode: gate.mode().to_string(),
                    dry_run: config.dry_run,
                },
            )
        });

        let parts = AgentParts {
            ledger,
            rules: (&config.treasury).into(),
            scanner,
            registry,
            selector: Arc::new(builder::build_selector(config)),
            gate,
            workers,
            memory: builder::build_memory(&config.memory),
        };
        let settings = LoopSettings {
            max_cycles,
            ..LoopSettings::from(&config.agent)
        };

        Ok(Self {
            agent: DecisionLoop::new(parts, settings, shutdown_tx),
            status,
        })
    }

    #[must_use]
    pub fn handle(&self) -> AgentHandle {
        self.agent.handle()
    }

    /// Run the loop to completion, then kill any worker still alive.
    pub async fn run(&self) {
        let handle = self.agent.handle();
        self.agent
            .run(|summary| self.publish(summary, &handle))
            .await;

        self.agent.workers().shutdown();
        info!(balance = %self.agent.ledger().balance(), "Agent stopped");
    }

    fn publish(&self, summary: &CycleSummary, handle: &AgentHandle) {
        let Some(status) = &self.status else {
            return;
        };
        status.record_cycle(
            summary,
            StatusRuntime {
                balance: self.agent.ledger().balance(),
                cycles: handle.cycle_count(),
                active_workers: self.agent.workers().active_count(),
                halted: handle.is_halted(),
                halt_reason: handle.halt_reason(),
            },
        );
        if let Err(e) = status.write() {
            warn!(error = %e, "Failed to write status file");
        }
    }
}
