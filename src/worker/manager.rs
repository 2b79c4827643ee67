//! Worker lifecycle manager.
//!
//! Spawn order is fixed: audit gate, budget admission (one concurrency slot
//! plus the timeout's worth of worker-minutes), launch, track. A supervisor
//! task per worker waits for exit, timeout, or a kill signal, then settles
//! the reservations and reports a [`WorkerOutcome`].

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::envelope::ResultEnvelope;
use super::runtime::{ExecutionUnit, LaunchSpec, UnitExit, WorkerRuntime};
use crate::audit::{AuditAction, AuditGate, RiskLevel};
use crate::budget::{Reservation, ResourceBudgetTracker};
use crate::domain::worker::minutes;
use crate::domain::{
    Amount, ResourceClass, ResourceRequest, TaskPayload, Worker, WorkerId, WorkerOutcome,
    WorkerStatus,
};
use crate::error::WorkerError;

/// Time given to an unresponsive unit to acknowledge a kill.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Manager-wide worker settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSettings {
    /// Level passed to every unit as `LOG_LEVEL`.
    pub log_level: String,
    /// Infrastructure cost of one worker-minute.
    pub cost_per_minute: Amount,
    /// Request used when a strategy does not supply its own.
    pub default_request: ResourceRequest,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            cost_per_minute: Decimal::new(1, 2),
            default_request: ResourceRequest {
                cpu_limit: 0.5,
                memory_limit_mb: 256,
                timeout: Duration::from_secs(300),
            },
        }
    }
}

struct WorkerEntry {
    worker: Worker,
    slot: Option<Reservation>,
    minutes: Option<Reservation>,
    kill_tx: Option<oneshot::Sender<()>>,
}

/// Handle to a spawned worker.
///
/// Dropping the handle before [`join`](Self::join) returns kills the worker,
/// so a caller that gives up waiting (timeout, shutdown) never leaves a unit
/// running on its budget.
pub struct WorkerHandle {
    id: WorkerId,
    outcome_rx: Option<oneshot::Receiver<WorkerOutcome>>,
    workers: Arc<DashMap<WorkerId, WorkerEntry>>,
}

impl WorkerHandle {
    #[must_use]
    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Wait for the worker's final outcome.
    pub async fn join(mut self) -> WorkerOutcome {
        let reported = match self.outcome_rx.as_mut() {
            Some(rx) => rx.await.ok(),
            None => None,
        };
        self.outcome_rx = None;
        reported.unwrap_or_else(|| WorkerOutcome {
            worker_id: self.id.clone(),
            status: WorkerStatus::Failed,
            result_payload: serde_json::Value::Null,
            minutes_used: Decimal::ZERO,
            error: Some("supervisor exited without reporting".into()),
        })
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.outcome_rx.is_some() && release(&self.workers, &self.id).is_ok() {
            warn!(worker_id = %self.id, "Worker abandoned by its caller, killed");
        }
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Untrack a worker, drop its reservations, and signal its supervisor.
fn release(workers: &DashMap<WorkerId, WorkerEntry>, worker_id: &WorkerId) -> Result<(), WorkerError> {
    let (_, mut entry) = workers
        .remove(worker_id)
        .ok_or_else(|| WorkerError::NotFound(worker_id.clone()))?;

    drop(entry.slot.take());
    drop(entry.minutes.take());
    if let Some(kill_tx) = entry.kill_tx.take() {
        let _ = kill_tx.send(());
    }
    Ok(())
}

/// Owns every live worker. Cheap to share behind an `Arc`.
pub struct WorkerManager {
    runtime: Arc<dyn WorkerRuntime>,
    budget: ResourceBudgetTracker,
    gate: Arc<AuditGate>,
    settings: WorkerSettings,
    workers: Arc<DashMap<WorkerId, WorkerEntry>>,
}

impl WorkerManager {
    pub fn new(
        runtime: Arc<dyn WorkerRuntime>,
        budget: ResourceBudgetTracker,
        gate: Arc<AuditGate>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            runtime,
            budget,
            gate,
            settings,
            workers: Arc::new(DashMap::new()),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    #[must_use]
    pub fn budget(&self) -> &ResourceBudgetTracker {
        &self.budget
    }

    /// Infrastructure cost of `minutes` worker-minutes.
    #[must_use]
    pub fn infra_cost(&self, minutes: Decimal) -> Amount {
        minutes * self.settings.cost_per_minute
    }

    /// Spawn a worker for `payload` with the given limits.
    ///
    /// Refuses immediately when the gate denies or a budget is exhausted;
    /// nothing is launched in either case.
    pub async fn spawn(
        &self,
        payload: TaskPayload,
        request: ResourceRequest,
    ) -> Result<WorkerHandle, WorkerError> {
        payload.validate().map_err(WorkerError::Launch)?;
        let worker_id = WorkerId::generate();
        let reserved_minutes = request.reserved_minutes();

        self.gate
            .require(
                &AuditAction::worker(format!("Spawn worker for {}", payload.strategy_id))
                    .detail("worker_id", &worker_id)
                    .detail("task_id", &payload.task_id)
                    .detail("cpu_limit", request.cpu_limit)
                    .detail("memory_mb", request.memory_limit_mb)
                    .detail("timeout_secs", request.timeout.as_secs())
                    .risk(RiskLevel::Medium),
            )
            .await?;

        let (slot, minutes_hold) = {
            let slot = self.budget.reserve(ResourceClass::ConcurrentWorkers, Decimal::ONE)?;
            let minutes_hold = self
                .budget
                .reserve(ResourceClass::WorkerMinutes, reserved_minutes)?;
            (slot, minutes_hold)
        };

        let task_json = serde_json::to_string(&payload)
            .map_err(|e| WorkerError::Launch(format!("task encoding failed: {e}")))?;

        let worker = Worker {
            id: worker_id.clone(),
            spawned_at: Utc::now(),
            cpu_limit: request.cpu_limit,
            memory_limit_mb: request.memory_limit_mb,
            task_payload: payload,
            status: WorkerStatus::Starting,
        };
        let (kill_tx, kill_rx) = oneshot::channel();
        self.workers.insert(
            worker_id.clone(),
            WorkerEntry {
                worker,
                slot: Some(slot),
                minutes: Some(minutes_hold),
                kill_tx: Some(kill_tx),
            },
        );

        let spec = LaunchSpec {
            worker_id: worker_id.clone(),
            task_json,
            log_level: self.settings.log_level.clone(),
            cpu_limit: request.cpu_limit,
            memory_limit_mb: request.memory_limit_mb,
            timeout: request.timeout,
        };

        // Untracks the entry (releasing its holds) if launch fails or this
        // future is dropped before a supervisor takes over.
        let mut guard = LaunchGuard {
            workers: &self.workers,
            worker_id: &worker_id,
            armed: true,
        };
        let mut unit = match self.runtime.launch(spec).await {
            Ok(unit) => unit,
            Err(e) => {
                warn!(worker_id = %worker_id, error = %e, "Worker launch failed");
                return Err(e);
            }
        };
        guard.armed = false;
        drop(guard);

        let running = match self.workers.get_mut(&worker_id) {
            Some(mut entry) => {
                entry.worker.status = WorkerStatus::Running;
                true
            }
            None => false,
        };
        if !running {
            // Killed while launching: reservations are already released.
            let _ = tokio::time::timeout(KILL_GRACE, unit.kill()).await;
            return Err(WorkerError::Killed(worker_id));
        }

        info!(
            worker_id = %worker_id,
            timeout_secs = request.timeout.as_secs(),
            reserved_minutes = %reserved_minutes,
            "Worker spawned"
        );

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let supervisor = Supervisor {
            worker_id: worker_id.clone(),
            workers: Arc::clone(&self.workers),
            timeout: request.timeout,
        };
        tokio::spawn(async move {
            let outcome = supervisor.run(unit, kill_rx).await;
            let _ = outcome_tx.send(outcome);
        });

        Ok(WorkerHandle {
            id: worker_id,
            outcome_rx: Some(outcome_rx),
            workers: Arc::clone(&self.workers),
        })
    }

    /// Forcibly terminate a worker and release its resources.
    ///
    /// Resources are released before the unit acknowledges anything.
    pub fn kill(&self, worker_id: &WorkerId) -> Result<(), WorkerError> {
        release(&self.workers, worker_id)?;
        warn!(worker_id = %worker_id, "Worker killed");
        Ok(())
    }

    /// Snapshot of live workers.
    #[must_use]
    pub fn active(&self) -> Vec<Worker> {
        self.workers
            .iter()
            .map(|entry| entry.value().worker.clone())
            .collect()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn status(&self, worker_id: &WorkerId) -> Option<WorkerStatus> {
        self.workers.get(worker_id).map(|entry| entry.worker.status)
    }

    /// Kill every live worker.
    pub fn shutdown(&self) {
        let ids: Vec<WorkerId> = self.workers.iter().map(|e| e.key().clone()).collect();
        if !ids.is_empty() {
            info!(count = ids.len(), "Killing live workers");
        }
        for id in ids {
            let _ = self.kill(&id);
        }
    }
}

struct LaunchGuard<'a> {
    workers: &'a DashMap<WorkerId, WorkerEntry>,
    worker_id: &'a WorkerId,
    armed: bool,
}

impl Drop for LaunchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.workers.remove(self.worker_id);
        }
    }
}

enum Ending {
    Exited(Result<UnitExit, WorkerError>),
    TimedOut,
    Killed,
}

struct Supervisor {
    worker_id: WorkerId,
    workers: Arc<DashMap<WorkerId, WorkerEntry>>,
    timeout: Duration,
}

impl Supervisor {
    async fn run(self, mut unit: Box<dyn ExecutionUnit>, kill_rx: oneshot::Receiver<()>) -> WorkerOutcome {
        let started = Instant::now();

        let ending = tokio::select! {
            exit = unit.wait() => Ending::Exited(exit),
            () = tokio::time::sleep(self.timeout) => Ending::TimedOut,
            Ok(()) = kill_rx => Ending::Killed,
        };

        if matches!(ending, Ending::TimedOut | Ending::Killed) {
            match tokio::time::timeout(KILL_GRACE, unit.kill()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(worker_id = %self.worker_id, error = %e, "Kill failed"),
                Err(_) => warn!(worker_id = %self.worker_id, "Unit did not acknowledge kill"),
            }
        }

        let elapsed = minutes(started.elapsed());
        let entry = self.workers.remove(&self.worker_id).map(|(_, entry)| entry);
        self.settle(ending, entry, elapsed)
    }

    fn settle(&self, ending: Ending, entry: Option<WorkerEntry>, elapsed: Decimal) -> WorkerOutcome {
        let id = self.worker_id.clone();
        // A missing entry means `kill` already removed it and released everything.
        let was_killed = entry.is_none();
        let (slot, minutes_hold) = match entry {
            Some(mut entry) => (entry.slot.take(), entry.minutes.take()),
            None => (None, None),
        };

        let outcome = match ending {
            Ending::Exited(Ok(exit)) if !was_killed => {
                let envelope = ResultEnvelope::parse(exit.result_line.as_deref());
                if exit.success {
                    let used = minutes_hold.map_or(Decimal::ZERO, |hold| hold.commit(elapsed));
                    WorkerOutcome {
                        worker_id: id,
                        status: WorkerStatus::Completed,
                        result_payload: envelope.result,
                        minutes_used: used,
                        error: None,
                    }
                } else {
                    let reason = envelope.error.unwrap_or_else(|| match exit.exit_code {
                        Some(code) => format!("exited with code {code}"),
                        None => "terminated by signal".into(),
                    });
                    WorkerOutcome {
                        worker_id: id,
                        status: WorkerStatus::Failed,
                        result_payload: envelope.result,
                        minutes_used: Decimal::ZERO,
                        error: Some(reason),
                    }
                }
            }
            Ending::Exited(Err(e)) if !was_killed => WorkerOutcome {
                worker_id: id,
                status: WorkerStatus::Failed,
                result_payload: serde_json::Value::Null,
                minutes_used: Decimal::ZERO,
                error: Some(e.to_string()),
            },
            Ending::TimedOut => WorkerOutcome {
                worker_id: id.clone(),
                status: WorkerStatus::Killed,
                result_payload: serde_json::Value::Null,
                minutes_used: Decimal::ZERO,
                error: Some(WorkerError::Timeout(id).to_string()),
            },
            _ => WorkerOutcome {
                worker_id: id.clone(),
                status: WorkerStatus::Killed,
                result_payload: serde_json::Value::Null,
                minutes_used: Decimal::ZERO,
                error: Some(WorkerError::Killed(id).to_string()),
            },
        };

        // Any hold not committed above is released here.
        drop(slot);

        debug!(
            worker_id = %outcome.worker_id,
            status = %outcome.status,
            minutes_used = %outcome.minutes_used,
            "Worker settled"
        );
        outcome
    }
}
