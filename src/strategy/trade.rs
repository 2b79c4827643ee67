//! Yield deployment strategy.
//!
//! Deploys a slice of the treasury into the pool named by the opportunity
//! and books the projected weekly yield.

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::{ExecutionContext, Strategy};
use crate::domain::{Amount, Opportunity, OpportunityKind, Outcome, StrategyId};
use crate::error::Result;

const WEEKS_PER_YEAR: Decimal = dec!(52);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    pub min_capital: Amount,
    /// Balance below which no position is opened.
    pub min_trade: Amount,
    /// Share of the balance deployed per position.
    pub deploy_fraction: Decimal,
    /// Cap on a single deployment.
    pub max_deploy: Amount,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            min_capital: dec!(10),
            min_trade: dec!(10),
            deploy_fraction: dec!(0.10),
            max_deploy: dec!(100),
        }
    }
}

pub struct TradeStrategy {
    id: StrategyId,
    config: TradeConfig,
}

impl TradeStrategy {
    #[must_use]
    pub fn new(config: TradeConfig) -> Self {
        Self {
            id: StrategyId::new("trade"),
            config,
        }
    }
}

#[async_trait]
impl Strategy for TradeStrategy {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn description(&self) -> &'static str {
        "Deploy capital into a yield pool and book projected weekly yield"
    }

    fn accepted_kinds(&self) -> &[OpportunityKind] {
        &[OpportunityKind::Trade]
    }

    fn min_capital(&self) -> Amount {
        self.config.min_capital
    }

    async fn execute(&self, opportunity: &Opportunity, ctx: &ExecutionContext) -> Result<Outcome> {
        let Some(pool_id) = opportunity.payload_str("pool_id").filter(|p| !p.is_empty()) else {
            return Ok(Outcome::failure(self.id.clone(), "no pool_id in opportunity payload"));
        };
        let project = opportunity.payload_str("project").unwrap_or("unknown");
        let apy = opportunity
            .payload_f64("apy")
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::ZERO);

        let balance = ctx.treasury.balance;
        if balance < self.config.min_trade {
            return Ok(Outcome::failure(
                self.id.clone(),
                format!(
                    "insufficient balance: {balance} < {} minimum",
                    self.config.min_trade
                ),
            ));
        }

        let deploy = (balance * self.config.deploy_fraction).min(self.config.max_deploy);
        let weekly_yield = (deploy * apy / dec!(100) / WEEKS_PER_YEAR).round_dp(3);

        info!(
            strategy = %self.id,
            pool_id = %pool_id,
            project = %project,
            deploy = %deploy,
            apy = %apy,
            "Deploying into pool"
        );

        Ok(Outcome::success(self.id.clone(), weekly_yield).with_details(json!({
            "pool_id": pool_id,
            "project": project,
            "deployed": deploy.to_string(),
            "apy": apy.to_string(),
            "projected_weekly_yield": weekly_yield.to_string(),
        })))
    }
}
