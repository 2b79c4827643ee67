use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::task::{payload_for, result_text, run_in_worker, TaskRun};
use super::{ExecutionContext, Strategy};
use crate::domain::{Amount, Opportunity, OpportunityKind, Outcome, StrategyId};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreelanceConfig {
    pub min_capital: Amount,
    /// Flat cost of producing one deliverable, on top of worker time.
    pub generation_cost: Amount,
}

impl Default for FreelanceConfig {
    fn default() -> Self {
        Self {
            min_capital: dec!(0.50),
            generation_cost: dec!(0.10),
        }
    }
}

/// Completes a posted task inside a worker and books the quoted fee.
pub struct FreelanceStrategy {
    id: StrategyId,
    config: FreelanceConfig,
}

impl FreelanceStrategy {
    #[must_use]
    pub fn new(config: FreelanceConfig) -> Self {
        Self {
            id: StrategyId::new("freelance"),
            config,
        }
    }
}

#[async_trait]
impl Strategy for FreelanceStrategy {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn description(&self) -> &'static str {
        "Complete a posted task in a worker and collect the fee"
    }

    fn accepted_kinds(&self) -> &[OpportunityKind] {
        &[OpportunityKind::Freelance]
    }

    fn min_capital(&self) -> Amount {
        self.config.min_capital
    }

    async fn execute(&self, opportunity: &Opportunity, ctx: &ExecutionContext) -> Result<Outcome> {
        let platform = opportunity.payload_str("platform").unwrap_or("unknown");
        let payload = payload_for(&self.id, opportunity)
            .with_field("kind", "freelance")
            .with_field("title", opportunity.title.clone())
            .with_field("description", opportunity.description.clone())
            .with_field("url", opportunity.payload_str("url").unwrap_or_default());

        let (worker_id, result, costs) =
            match run_in_worker(&self.id, payload, self.config.generation_cost, ctx).await? {
                TaskRun::Completed {
                    worker_id,
                    result,
                    costs,
                } => (worker_id, result, costs),
                TaskRun::Failed(outcome) => return Ok(outcome),
            };

        let Some(deliverable) = result_text(&result, "deliverable") else {
            return Ok(Outcome::failure(self.id.clone(), "worker produced no deliverable")
                .with_costs(costs)
                .with_worker(worker_id));
        };

        info!(
            strategy = %self.id,
            platform = %platform,
            chars = deliverable.len(),
            "Deliverable produced"
        );

        Ok(Outcome::success(self.id.clone(), opportunity.estimated_return)
            .with_costs(costs)
            .with_worker(worker_id)
            .with_details(json!({
                "platform": platform,
                "title": opportunity.title,
                "deliverable_chars": deliverable.len(),
            })))
    }
}
