//! Price-gap capture strategy.

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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrageConfig {
    pub min_capital: Amount,
    pub deploy_fraction: Decimal,
    pub max_deploy: Amount,
    /// Base assets with an executable venue. Others are reported, not traded.
    pub supported_bases: Vec<String>,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_capital: dec!(5),
            deploy_fraction: dec!(0.10),
            max_deploy: dec!(25),
            supported_bases: vec!["SOL".into()],
        }
    }
}

pub struct ArbitrageStrategy {
    id: StrategyId,
    config: ArbitrageConfig,
}

impl ArbitrageStrategy {
    #[must_use]
    pub fn new(config: ArbitrageConfig) -> Self {
        Self {
            id: StrategyId::new("arbitrage"),
            config,
        }
    }

    fn supports(&self, base: &str) -> bool {
        self.config
            .supported_bases
            .iter()
            .any(|b| b.eq_ignore_ascii_case(base))
    }
}

#[async_trait]
impl Strategy for ArbitrageStrategy {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn description(&self) -> &'static str {
        "Capture a quoted price gap between two venues"
    }

    fn accepted_kinds(&self) -> &[OpportunityKind] {
        &[OpportunityKind::Arbitrage]
    }

    fn min_capital(&self) -> Amount {
        self.config.min_capital
    }

    async fn execute(&self, opportunity: &Opportunity, ctx: &ExecutionContext) -> Result<Outcome> {
        let base = opportunity.payload_str("base").unwrap_or("ETH");
        let quote = opportunity.payload_str("quote").unwrap_or("USDC");
        let buy_on = opportunity.payload_str("buy_on").unwrap_or("unknown");
        let gap_pct = opportunity
            .payload_f64("gap_pct")
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::ZERO);

        if !self.supports(base) {
            info!(
                strategy = %self.id,
                pair = %format!("{base}/{quote}"),
                gap_pct = %gap_pct,
                "Gap detected on unsupported pair, not executing"
            );
            return Ok(Outcome::failure(
                self.id.clone(),
                format!("{base}/{quote} gap of {gap_pct}% detected but no venue executes {base}"),
            ));
        }

        let deploy = (ctx.treasury.balance * self.config.deploy_fraction).min(self.config.max_deploy);
        if deploy < self.config.min_capital {
            return Ok(Outcome::failure(
                self.id.clone(),
                format!(
                    "deployable {deploy} below minimum {}",
                    self.config.min_capital
                ),
            ));
        }

        let net = (deploy * gap_pct / dec!(100)).round_dp(4);
        info!(
            strategy = %self.id,
            pair = %format!("{base}/{quote}"),
            buy_on = %buy_on,
            deploy = %deploy,
            net = %net,
            "Captured price gap"
        );

        Ok(Outcome::success(self.id.clone(), net).with_details(json!({
            "base": base,
            "quote": quote,
            "buy_on": buy_on,
            "gap_pct": gap_pct.to_string(),
            "deployed": deploy.to_string(),
        })))
    }
}
