//! Strategy listing.

use tabled::Tabled;

use crate::app::build_strategy_registry;
use crate::cli::output;
use crate::config::StrategiesConfig;
use crate::error::Result;

#[derive(Tabled)]
struct StrategyRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Accepts")]
    accepts: String,
    #[tabled(rename = "Min Capital")]
    min_capital: String,
    #[tabled(rename = "Description")]
    description: &'static str,
}

/// List built-in strategies with their default parameters.
#[allow(clippy::result_large_err)]
pub fn list() -> Result<()> {
    let registry = build_strategy_registry(&StrategiesConfig::default())?;

    output::section("Built-in strategies");
    output::table(registry.all().iter().map(|strategy| StrategyRow {
        name: strategy.id().to_string(),
        accepts: strategy
            .accepted_kinds()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        min_capital: strategy.min_capital().to_string(),
        description: strategy.description(),
    }));
    println!();
    output::note("Enable strategies under [strategies] enabled = [...] in agora.toml");

    Ok(())
}
