mod support;

use std::sync::Arc;
use std::time::Duration;

use agora::agent::{CycleDisposition, LoopState, TopRankedSelector};
use agora::audit::{AuditGate, AuditMode, QueueApproval};
use agora::domain::{LedgerCategory, LedgerEntry, OpportunityKind, ResourceClass};
use agora::error::{Error, Result};
use agora::strategy::{FreelanceConfig, FreelanceStrategy};
use agora::treasury::{LedgerStore, TreasuryLedger};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use support::agent::AgentSetup;
use support::memory::RecordingMemory;
use support::opportunity::raw;
use support::runtime::ScriptedRuntime;
use support::selector::{Pick, ScriptedSelector};
use support::strategy::{FixedStrategy, StalledStrategy};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn e2e_top_ranked_opportunity_books_income() {
    let trade = Arc::new(FixedStrategy::earning("trade", OpportunityKind::Trade, dec!(2.00)));
    let selector = Arc::new(ScriptedSelector::new(Pick::Top));
    let setup = AgentSetup::funded(dec!(100.00))
        .strategy(trade.clone())
        .selector(selector.clone())
        .records(
            "pools",
            vec![
                raw("low", "trade", dec!(2.0)),
                raw("high", "trade", dec!(8.3)),
                raw("mid", "trade", dec!(4.1)),
            ],
        );
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::Executed);
    assert_eq!(summary.cycle, 1);
    assert_eq!(summary.opportunities, 3);
    assert_eq!(summary.ledger_delta, dec!(2.00));
    assert_eq!(summary.opportunity.as_ref().map(|o| o.id.as_str()), Some("high"));

    let seen = selector.seen_scores();
    assert_eq!(seen.len(), 1);
    let expected = [8.3, 4.1, 2.0];
    assert!(seen[0].iter().zip(expected).all(|(a, b)| close(*a, b)));

    assert_eq!(agent.ledger().balance(), dec!(102.00));
    assert_eq!(agent.cycle_count(), 1);
    let entries = agent.ledger().entries();
    assert_eq!(entries.len(), 2);
    let booked = entries.last().unwrap();
    assert_eq!(booked.category, LedgerCategory::Income);
    assert_eq!(booked.amount, dec!(2.00));
    assert_eq!(trade.executions(), 1);

    let records = setup.memory.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ledger_delta, dec!(2.00));
    assert!(records[0].outcome.success);
    assert_eq!(agent.state(), LoopState::Idle);
}

#[tokio::test]
async fn top_ranked_selector_skips_unserved_kinds() {
    let content = Arc::new(FixedStrategy::earning("content", OpportunityKind::Content, dec!(1)));
    let setup = AgentSetup::funded(dec!(50))
        .strategy(content.clone())
        .selector(Arc::new(TopRankedSelector::default()))
        .records(
            "mixed",
            vec![
                raw("gig", "freelance", dec!(9)),
                raw("post", "content", dec!(3)),
            ],
        );
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::Executed);
    assert_eq!(summary.opportunity.unwrap().id.as_str(), "post");
    assert_eq!(agent.ledger().balance(), dec!(51));
}

#[tokio::test]
async fn e2e_zero_opportunities_goes_straight_to_idle() {
    let trade = Arc::new(FixedStrategy::earning("trade", OpportunityKind::Trade, dec!(2)));
    let selector = Arc::new(ScriptedSelector::new(Pick::Top));
    let setup = AgentSetup::funded(dec!(100))
        .strategy(trade.clone())
        .selector(selector.clone())
        .records("empty", Vec::new());
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::NoOpportunities);
    assert_eq!(summary.cycle, 1);
    assert_eq!(agent.cycle_count(), 1);
    assert_eq!(agent.state(), LoopState::Idle);
    assert!(agent.last_state().ranked_opportunities.is_empty());
    assert_eq!(agent.ledger().balance(), dec!(100));
    assert_eq!(agent.ledger().len(), 1);
    assert_eq!(selector.calls(), 0);
    assert_eq!(trade.executions(), 0);
    assert_eq!(setup.runtime.launch_count(), 0);
    assert!(setup.memory.records().is_empty());
}

#[tokio::test]
async fn declined_selection_has_no_side_effects() {
    let trade = Arc::new(FixedStrategy::earning("trade", OpportunityKind::Trade, dec!(2)));
    let setup = AgentSetup::funded(dec!(100))
        .strategy(trade.clone())
        .selector(Arc::new(ScriptedSelector::new(Pick::Decline)))
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::Declined);
    assert_eq!(agent.cycle_count(), 1);
    assert_eq!(trade.executions(), 0);
    assert_eq!(agent.ledger().balance(), dec!(100));
    assert!(setup.memory.records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unanswered_audit_denies_without_side_effects() {
    let (channel, _pending) = QueueApproval::new(4);
    let gate = Arc::new(AuditGate::new(
        AuditMode::Audit,
        Duration::from_secs(30),
        Arc::new(channel),
    ));
    let trade = Arc::new(FixedStrategy::earning("trade", OpportunityKind::Trade, dec!(2)));
    let setup = AgentSetup::funded(dec!(100))
        .strategy(trade.clone())
        .gate(gate)
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::Denied);
    assert!(summary.error.unwrap().contains("timed out"));
    assert_eq!(trade.executions(), 0);
    assert_eq!(agent.ledger().balance(), dec!(100));
    assert_eq!(agent.ledger().len(), 1);
    assert_eq!(setup.runtime.launch_count(), 0);
    assert_eq!(agent.workers().active_count(), 0);
    assert!(setup.memory.records().is_empty());
}

#[tokio::test]
async fn approved_audit_gates_execution_and_commit() {
    let (channel, mut requests) = QueueApproval::new(8);
    let gate = Arc::new(AuditGate::new(
        AuditMode::Audit,
        Duration::from_secs(30),
        Arc::new(channel),
    ));
    let approver = tokio::spawn(async move {
        let mut titles = Vec::new();
        while let Some(request) = requests.recv().await {
            titles.push(request.action.title.clone());
            request.approve();
        }
        titles
    });

    let trade = Arc::new(FixedStrategy::earning("trade", OpportunityKind::Trade, dec!(2)));
    let setup = AgentSetup::funded(dec!(100))
        .strategy(trade)
        .gate(gate)
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    let agent = setup.build();

    let summary = agent.run_cycle().await;
    assert_eq!(summary.disposition, CycleDisposition::Executed);
    assert_eq!(agent.ledger().balance(), dec!(102));

    drop(agent);
    drop(setup);
    let titles = approver.await.unwrap();
    assert_eq!(titles.len(), 2, "strategy execution and income commit: {titles:?}");
}

#[tokio::test]
async fn failed_strategy_still_books_costs_and_is_remembered() {
    let trade = Arc::new(FixedStrategy::failing("trade", OpportunityKind::Trade, dec!(0.50)));
    let setup = AgentSetup::funded(dec!(100))
        .strategy(trade)
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::Failed);
    assert_eq!(summary.ledger_delta, dec!(-0.50));
    assert_eq!(agent.ledger().balance(), dec!(99.50));
    let records = setup.memory.records();
    assert_eq!(records.len(), 1);
    assert!(!records[0].outcome.success);
}

#[tokio::test]
async fn unaffordable_costs_are_not_booked() {
    let trade = Arc::new(
        FixedStrategy::earning("trade", OpportunityKind::Trade, dec!(0)).with_costs(dec!(5)),
    );
    let setup = AgentSetup::funded(dec!(1))
        .strategy(trade)
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::Failed);
    assert!(summary.error.unwrap().contains("insufficient funds"));
    assert_eq!(agent.ledger().balance(), dec!(1));
    assert!(!agent.handle().is_halted());
}

#[tokio::test]
async fn memory_failure_does_not_roll_back_ledger() {
    let trade = Arc::new(FixedStrategy::earning("trade", OpportunityKind::Trade, dec!(2)));
    let setup = AgentSetup::funded(dec!(100))
        .strategy(trade)
        .memory(Arc::new(RecordingMemory::failing()))
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::Executed);
    assert_eq!(agent.ledger().balance(), dec!(102));
}

/// Store that accepts `remaining` appends, then fails every write.
struct FlakyStore {
    entries: Mutex<Vec<LedgerEntry>>,
    remaining: Mutex<usize>,
}

impl LedgerStore for FlakyStore {
    fn append(&self, entry: &LedgerEntry) -> Result<()> {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            return Err(Error::Database("disk I/O error".into()));
        }
        *remaining -= 1;
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.entries.lock().clone())
    }
}

#[tokio::test]
async fn store_failure_halts_until_cleared() {
    let store = FlakyStore {
        entries: Mutex::new(vec![LedgerEntry::transfer(dec!(100), "seed")]),
        remaining: Mutex::new(0),
    };
    let ledger = Arc::new(TreasuryLedger::open(Arc::new(store)).unwrap());
    let trade = Arc::new(FixedStrategy::earning("trade", OpportunityKind::Trade, dec!(2)));
    let setup = AgentSetup::with_ledger(ledger)
        .strategy(trade.clone())
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    let agent = setup.build();
    let handle = agent.handle();

    let first = agent.run_cycle().await;
    assert_eq!(first.disposition, CycleDisposition::Failed);
    assert!(handle.is_halted());
    assert!(handle.halt_reason().unwrap().contains("disk I/O error"));
    assert_eq!(agent.ledger().balance(), dec!(100));
    assert_eq!(agent.cycle_count(), 1);

    let halted = agent.run_cycle().await;
    assert_eq!(halted.disposition, CycleDisposition::Halted);
    assert_eq!(agent.cycle_count(), 1);
    assert_eq!(trade.executions(), 1);

    handle.clear_halt();
    let resumed = agent.run_cycle().await;
    assert_ne!(resumed.disposition, CycleDisposition::Halted);
    assert_eq!(trade.executions(), 2);
}

#[tokio::test(start_paused = true)]
async fn stalled_strategy_times_out_into_failure() {
    let setup = AgentSetup::funded(dec!(100))
        .strategy(Arc::new(StalledStrategy::new("trade", OpportunityKind::Trade)))
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::Failed);
    assert!(summary.error.unwrap().contains("timed out"));
    assert_eq!(agent.ledger().balance(), dec!(100));
    assert_eq!(setup.memory.records().len(), 1);
}

#[tokio::test]
async fn shutdown_interrupts_a_stalled_strategy() {
    let setup = AgentSetup::funded(dec!(100))
        .strategy(Arc::new(StalledStrategy::new("trade", OpportunityKind::Trade)))
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    let agent = Arc::new(setup.build());
    let handle = agent.handle();

    let running = tokio::spawn({
        let agent = Arc::clone(&agent);
        async move { agent.run_cycle().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.shutdown();

    let summary = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("cycle observes shutdown")
        .unwrap();
    assert_eq!(summary.disposition, CycleDisposition::Failed);
    assert!(summary.error.unwrap().contains("cancelled"));

    let after = agent.run_cycle().await;
    assert_eq!(after.disposition, CycleDisposition::Cancelled);
}

#[tokio::test]
async fn run_stops_after_max_cycles() {
    let mut setup = AgentSetup::funded(dec!(100))
        .strategy(Arc::new(FixedStrategy::earning("trade", OpportunityKind::Trade, dec!(1))))
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    setup.settings.max_cycles = Some(3);
    let agent = setup.build();

    let mut dispositions = Vec::new();
    agent.run(|summary| dispositions.push(summary.disposition)).await;

    assert_eq!(dispositions, vec![CycleDisposition::Executed; 3]);
    assert_eq!(agent.cycle_count(), 3);
    assert_eq!(agent.ledger().balance(), dec!(103));
}

#[tokio::test]
async fn run_returns_promptly_after_shutdown() {
    let mut setup = AgentSetup::funded(dec!(100)).records("empty", Vec::new());
    setup.settings.interval = Duration::from_secs(3600);
    let agent = Arc::new(setup.build());
    let handle = agent.handle();

    let running = tokio::spawn({
        let agent = Arc::clone(&agent);
        async move { agent.run(|_| {}).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.shutdown();

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("loop stops during its sleep")
        .unwrap();
    assert_eq!(agent.cycle_count(), 1);
}

#[tokio::test]
async fn freelance_runs_in_an_isolated_worker() {
    let runtime = Arc::new(ScriptedRuntime::completing(
        serde_json::json!({ "deliverable": "Draft attached." }),
    ));
    let mut setup = AgentSetup::funded(dec!(100))
        .strategy(Arc::new(FreelanceStrategy::new(FreelanceConfig::default())));
    setup.runtime = runtime.clone();
    let mut gig = raw("gig-1", "freelance", dec!(5));
    gig.description = "Summarize a report".into();
    let setup = setup.records("jobs", vec![gig]);
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::Executed);
    assert_eq!(summary.worker_ids.len(), 1);
    let balance = agent.ledger().balance();
    assert!(balance > dec!(104.8) && balance < dec!(105), "balance {balance}");

    let launches = runtime.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].log_level, "info");
    assert!(launches[0].task_json.contains("Summarize a report"));
    assert!(!launches[0].task_json.contains("balance"));
    assert_eq!(agent.workers().active_count(), 0);
}

fn assert_send<T: Send>(_: &T) {}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loop_futures_can_be_spawned_on_the_runtime() {
    let mut setup = AgentSetup::funded(dec!(100))
        .strategy(Arc::new(FixedStrategy::earning("trade", OpportunityKind::Trade, dec!(1))))
        .records("pools", vec![raw("p", "trade", dec!(5))]);
    setup.settings.max_cycles = Some(1);
    let agent = Arc::new(setup.build());

    assert_send(&agent.run_cycle());
    assert_send(&agent.run(|_| {}));

    let summary = tokio::spawn({
        let agent = Arc::clone(&agent);
        async move { agent.run_cycle().await }
    })
    .await
    .unwrap();
    assert_eq!(summary.disposition, CycleDisposition::Executed);

    tokio::spawn({
        let agent = Arc::clone(&agent);
        async move { agent.run(|_| {}).await }
    })
    .await
    .unwrap();
    assert_eq!(agent.cycle_count(), 2);
}

fn hanging_freelance() -> (AgentSetup, Arc<ScriptedRuntime>) {
    let runtime = Arc::new(ScriptedRuntime::hanging());
    let mut setup = AgentSetup::funded(dec!(100))
        .strategy(Arc::new(FreelanceStrategy::new(FreelanceConfig::default())));
    setup.runtime = runtime.clone();
    (
        setup.records("jobs", vec![raw("gig-1", "freelance", dec!(5))]),
        runtime,
    )
}

#[tokio::test(start_paused = true)]
async fn strategy_timeout_kills_its_worker_and_returns_the_budget() {
    let (setup, runtime) = hanging_freelance();
    let agent = setup.build();

    let summary = agent.run_cycle().await;

    assert_eq!(summary.disposition, CycleDisposition::Failed);
    assert!(summary.error.unwrap().contains("timed out"));
    assert_eq!(runtime.launch_count(), 1);
    assert_eq!(agent.workers().active_count(), 0);
    let budget = agent.workers().budget();
    assert_eq!(budget.budget(ResourceClass::ConcurrentWorkers).unwrap().in_use(), dec!(0));
    assert_eq!(budget.budget(ResourceClass::WorkerMinutes).unwrap().in_use(), dec!(0));
    assert_eq!(agent.ledger().balance(), dec!(100));

    // The supervisor acknowledges the kill on its next poll.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(runtime.kill_count(), 1);
}

#[tokio::test]
async fn shutdown_during_a_worker_task_kills_the_worker() {
    let (setup, runtime) = hanging_freelance();
    let agent = Arc::new(setup.build());
    let handle = agent.handle();

    let running = tokio::spawn({
        let agent = Arc::clone(&agent);
        async move { agent.run_cycle().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(agent.workers().active_count(), 1);
    handle.shutdown();

    let summary = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("cycle observes shutdown")
        .unwrap();
    assert_eq!(summary.disposition, CycleDisposition::Failed);
    assert!(summary.error.unwrap().contains("cancelled"));
    assert_eq!(agent.workers().active_count(), 0);
    let budget = agent.workers().budget();
    assert_eq!(budget.budget(ResourceClass::ConcurrentWorkers).unwrap().in_use(), dec!(0));
    assert_eq!(budget.budget(ResourceClass::WorkerMinutes).unwrap().in_use(), dec!(0));

    tokio::time::timeout(Duration::from_secs(5), async {
        while runtime.kill_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("unit is killed");
}
