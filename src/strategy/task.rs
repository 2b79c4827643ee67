//! Shared plumbing for strategies that do their work inside a worker.

use serde_json::Value;
use tracing::{debug, warn};

use super::ExecutionContext;
use crate::domain::{Amount, Opportunity, Outcome, StrategyId, TaskPayload, WorkerId};
use crate::error::Result;

/// How a worker-backed task ended.
pub(super) enum TaskRun {
    /// The worker completed; `costs` covers minutes used plus generation.
    Completed {
        worker_id: WorkerId,
        result: Value,
        costs: Amount,
    },
    /// Expected failure, already shaped as an outcome.
    Failed(Outcome),
}

/// Build the payload skeleton every worker task starts from.
pub(super) fn payload_for(strategy_id: &StrategyId, opportunity: &Opportunity) -> TaskPayload {
    TaskPayload::new(opportunity.reference().to_string(), strategy_id.clone())
}

/// Spawn one worker for `payload`, wait for it, and price the result.
///
/// The worst case (full timeout plus generation) must fit within the
/// context's spend budget before anything is spawned. Gate denials and
/// budget refusals from the manager propagate as errors.
pub(super) async fn run_in_worker(
    strategy_id: &StrategyId,
    payload: TaskPayload,
    generation_cost: Amount,
    ctx: &ExecutionContext,
) -> Result<TaskRun> {
    let request = ctx.workers.settings().default_request;
    let worst_case = ctx.workers.infra_cost(request.reserved_minutes()) + generation_cost;
    if worst_case > ctx.spend_budget {
        return Ok(TaskRun::Failed(Outcome::failure(
            strategy_id.clone(),
            format!(
                "estimated cost {worst_case} exceeds spend budget {}",
                ctx.spend_budget
            ),
        )));
    }

    let handle = ctx.workers.spawn(payload, request).await?;
    let worker_id = handle.id().clone();
    debug!(strategy = %strategy_id, worker_id = %worker_id, "Waiting on worker");
    let outcome = handle.join().await;

    if !outcome.is_success() {
        let reason = outcome
            .error
            .unwrap_or_else(|| format!("worker {}", outcome.status));
        warn!(strategy = %strategy_id, worker_id = %worker_id, error = %reason, "Worker task failed");
        return Ok(TaskRun::Failed(
            Outcome::failure(strategy_id.clone(), reason).with_worker(worker_id),
        ));
    }

    let costs = ctx.workers.infra_cost(outcome.minutes_used) + generation_cost;
    Ok(TaskRun::Completed {
        worker_id,
        result: outcome.result_payload,
        costs,
    })
}

/// Non-empty string field from a worker result.
pub(super) fn result_text<'a>(result: &'a Value, key: &str) -> Option<&'a str> {
    result
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
