//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file (default `agora.toml`). Two
//! settings can be overridden from the environment: `AGORA_AUDIT_MODE` and
//! `AGORA_DATABASE`. Credentials are never read from the file.
//!
//! # Example
//!
//! ```no_run
//! use agora::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("agora.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::audit::AuditMode;
use crate::error::{ConfigError, Result};

mod logging;
mod sections;

pub use logging::{LogFormat, LoggingConfig};
pub use sections::{
    AgentConfig, AuditConfig, BudgetConfig, MemoryConfig, ScannerConfig, ScoringConfig,
    SourceConfig, StrategiesConfig, TreasuryConfig, WorkerConfig,
};

/// Env var overriding `[audit] mode`.
pub const AUDIT_MODE_ENV: &str = "AGORA_AUDIT_MODE";
/// Env var overriding `[treasury] database`.
pub const DATABASE_ENV: &str = "AGORA_DATABASE";

const KNOWN_STRATEGIES: [&str; 4] = ["trade", "arbitrage", "freelance", "content"];

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub treasury: TreasuryConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub strategies: StrategiesConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Run against an in-memory ledger; nothing is persisted.
    #[serde(default)]
    pub dry_run: bool,
}

impl Config {
    /// Parse configuration from TOML content, apply environment overrides,
    /// and validate.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    #[allow(clippy::result_large_err)]
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(AUDIT_MODE_ENV) {
            self.audit.mode = raw
                .parse::<AuditMode>()
                .map_err(|reason| ConfigError::InvalidValue {
                    field: AUDIT_MODE_ENV,
                    reason,
                })?;
        }
        if let Ok(database) = std::env::var(DATABASE_ENV) {
            if !database.trim().is_empty() {
                self.treasury.database = database;
            }
        }
        Ok(())
    }

    /// Check every value is within range.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        self.logging
            .check_level()
            .map_err(|reason| invalid("level", reason))?;
        if self.agent.interval_secs == 0 {
            return Err(invalid("interval_secs", "must be greater than 0"));
        }
        if self.agent.strategy_timeout_secs == 0 {
            return Err(invalid("strategy_timeout_secs", "must be greater than 0"));
        }
        if !self.agent.min_score.is_finite() {
            return Err(invalid("min_score", "must be a finite number"));
        }

        if self.treasury.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }
        check_fraction("reinvest_fraction", self.treasury.reinvest_fraction)?;
        check_fraction("max_infra_spend_fraction", self.treasury.max_infra_spend_fraction)?;

        if self.budget.period_hours == 0 {
            return Err(invalid("period_hours", "must be greater than 0"));
        }
        if self.budget.worker_minutes < Decimal::ZERO {
            return Err(invalid("worker_minutes", "must be 0 or greater"));
        }

        if !(self.worker.cpu_limit > 0.0 && self.worker.cpu_limit.is_finite()) {
            return Err(invalid("cpu_limit", "must be greater than 0"));
        }
        if self.worker.memory_limit_mb == 0 {
            return Err(invalid("memory_limit_mb", "must be greater than 0"));
        }
        if self.worker.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be greater than 0"));
        }
        if self.worker.cost_per_minute < Decimal::ZERO {
            return Err(invalid("cost_per_minute", "must be 0 or greater"));
        }
        if self.worker.program.as_os_str().is_empty() {
            return Err(ConfigError::MissingField { field: "program" }.into());
        }

        if self.scanner.max_fan_out == 0 {
            return Err(invalid("max_fan_out", "must be greater than 0"));
        }
        if self.scanner.source_timeout_secs == 0 {
            return Err(invalid("source_timeout_secs", "must be greater than 0"));
        }
        let mut names = std::collections::HashSet::new();
        for source in &self.scanner.sources {
            if source.name().trim().is_empty() {
                return Err(ConfigError::MissingField { field: "sources.name" }.into());
            }
            if !names.insert(source.name()) {
                return Err(invalid(
                    "sources",
                    format!("duplicate source name '{}'", source.name()),
                ));
            }
            if let SourceConfig::Http { url, .. } = source {
                url::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                    field: "sources.url",
                    reason: format!("{url}: {e}"),
                })?;
            }
        }

        if !(self.scoring.risk_floor > 0.0 && self.scoring.risk_floor.is_finite()) {
            return Err(invalid("risk_floor", "must be greater than 0"));
        }
        if !self.scoring.penalty.is_finite() {
            return Err(invalid("penalty", "must be a finite number"));
        }

        if self.audit.timeout_secs == 0 {
            return Err(invalid("audit.timeout_secs", "must be greater than 0"));
        }
        // A strategy waits on one spawn approval and then on its worker.
        let worker_bound = self.worker.timeout_secs.saturating_add(self.audit.timeout_secs);
        if self.agent.strategy_timeout_secs <= worker_bound {
            return Err(invalid(
                "strategy_timeout_secs",
                format!(
                    "must exceed worker.timeout_secs + audit.timeout_secs ({worker_bound})"
                ),
            ));
        }

        if self.strategies.enabled.is_empty() {
            return Err(invalid("enabled", "at least one strategy must be enabled"));
        }
        if let Some(unknown) = self
            .strategies
            .enabled
            .iter()
            .find(|id| !KNOWN_STRATEGIES.contains(&id.as_str()))
        {
            return Err(invalid("enabled", format!("unknown strategy '{unknown}'")));
        }
        check_fraction("trade.deploy_fraction", self.strategies.trade.deploy_fraction)?;
        check_fraction(
            "arbitrage.deploy_fraction",
            self.strategies.arbitrage.deploy_fraction,
        )?;

        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
    .into()
}

#[allow(clippy::result_large_err)]
fn check_fraction(field: &'static str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(invalid(field, "must be between 0 and 1"));
    }
    Ok(())
}
