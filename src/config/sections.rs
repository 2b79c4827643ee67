//! Configuration sections and their conversions into runtime settings.

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::agent::LoopSettings;
use crate::audit::AuditMode;
use crate::budget::BudgetLimits;
use crate::domain::{OpportunityKind, RawOpportunity, ResourceClass, ResourceRequest};
use crate::scanner::{RiskAdjustedScorer, ScanSettings};
use crate::strategy::{ArbitrageConfig, ContentConfig, FreelanceConfig, TradeConfig};
use crate::treasury::TreasuryRules;
use crate::worker::WorkerSettings;

/// Decision loop configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentConfig {
    /// Pause between cycles (default: 300).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Deadline for one strategy execution (default: 900).
    ///
    /// Must exceed the worker timeout plus the audit timeout.
    #[serde(default = "default_strategy_timeout_secs")]
    pub strategy_timeout_secs: u64,
    /// Opportunities scoring below this are never selected.
    #[serde(default)]
    pub min_score: f64,
    /// JSON status file for external monitoring.
    #[serde(default)]
    pub status_file: Option<PathBuf>,
}

const fn default_interval_secs() -> u64 {
    300
}

const fn default_strategy_timeout_secs() -> u64 {
    900
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            strategy_timeout_secs: default_strategy_timeout_secs(),
            min_score: 0.0,
            status_file: None,
        }
    }
}

impl From<&AgentConfig> for LoopSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            strategy_timeout: Duration::from_secs(config.strategy_timeout_secs),
            max_cycles: None,
        }
    }
}

/// Ledger storage and profit routing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TreasuryConfig {
    /// SQLite database path. Overridden by `AGORA_DATABASE`.
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_reinvest_fraction")]
    pub reinvest_fraction: Decimal,
    #[serde(default = "default_max_infra_spend_fraction")]
    pub max_infra_spend_fraction: Decimal,
}

fn default_database() -> String {
    "data/agora.db".into()
}

fn default_reinvest_fraction() -> Decimal {
    dec!(0.70)
}

fn default_max_infra_spend_fraction() -> Decimal {
    dec!(0.10)
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            reinvest_fraction: default_reinvest_fraction(),
            max_infra_spend_fraction: default_max_infra_spend_fraction(),
        }
    }
}

impl From<&TreasuryConfig> for TreasuryRules {
    fn from(config: &TreasuryConfig) -> Self {
        Self {
            reinvest_fraction: config.reinvest_fraction,
            max_infra_spend_fraction: config.max_infra_spend_fraction,
        }
    }
}

/// Per-period resource caps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BudgetConfig {
    /// Period length; budgets reset at each boundary (default: 24).
    #[serde(default = "default_period_hours")]
    pub period_hours: u32,
    /// Worker-minutes per period.
    #[serde(default = "default_worker_minutes")]
    pub worker_minutes: Decimal,
    /// Workers alive at once.
    #[serde(default = "default_concurrent_workers")]
    pub concurrent_workers: u32,
}

const fn default_period_hours() -> u32 {
    24
}

fn default_worker_minutes() -> Decimal {
    dec!(600)
}

const fn default_concurrent_workers() -> u32 {
    3
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            period_hours: default_period_hours(),
            worker_minutes: default_worker_minutes(),
            concurrent_workers: default_concurrent_workers(),
        }
    }
}

impl From<&BudgetConfig> for BudgetLimits {
    fn from(config: &BudgetConfig) -> Self {
        BudgetLimits::new(chrono::Duration::hours(i64::from(config.period_hours)))
            .with_cap(ResourceClass::WorkerMinutes, config.worker_minutes)
            .with_cap(
                ResourceClass::ConcurrentWorkers,
                Decimal::from(config.concurrent_workers),
            )
    }
}

/// Worker execution unit settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkerConfig {
    /// Executable run once per task.
    #[serde(default = "default_program")]
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_cpu_limit")]
    pub cpu_limit: f64,
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,
    #[serde(default = "default_worker_timeout_secs")]
    pub timeout_secs: u64,
    /// Passed to every unit as `LOG_LEVEL`.
    #[serde(default = "default_worker_log_level")]
    pub log_level: String,
    #[serde(default = "default_cost_per_minute")]
    pub cost_per_minute: Decimal,
}

fn default_program() -> PathBuf {
    PathBuf::from("agora-worker")
}

const fn default_cpu_limit() -> f64 {
    0.5
}

const fn default_memory_limit_mb() -> u64 {
    256
}

const fn default_worker_timeout_secs() -> u64 {
    300
}

fn default_worker_log_level() -> String {
    "info".into()
}

fn default_cost_per_minute() -> Decimal {
    dec!(0.01)
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            cpu_limit: default_cpu_limit(),
            memory_limit_mb: default_memory_limit_mb(),
            timeout_secs: default_worker_timeout_secs(),
            log_level: default_worker_log_level(),
            cost_per_minute: default_cost_per_minute(),
        }
    }
}

impl From<&WorkerConfig> for WorkerSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            log_level: config.log_level.clone(),
            cost_per_minute: config.cost_per_minute,
            default_request: ResourceRequest {
                cpu_limit: config.cpu_limit,
                memory_limit_mb: config.memory_limit_mb,
                timeout: Duration::from_secs(config.timeout_secs),
            },
        }
    }
}

/// One opportunity source.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// JSON array file, re-read each scan.
    File { name: String, path: PathBuf },
    /// HTTP GET returning a JSON array.
    Http { name: String, url: String },
    /// Records listed inline.
    Static {
        name: String,
        #[serde(default)]
        records: Vec<RawOpportunity>,
    },
}

impl SourceConfig {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Http { name, .. } | Self::Static { name, .. } => name,
        }
    }
}

/// Scanner fan-out and filtering.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_max_fan_out")]
    pub max_fan_out: usize,
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,
    /// Restrict scanning to these kinds. Empty means all.
    #[serde(default)]
    pub focus: Vec<OpportunityKind>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

const fn default_max_fan_out() -> usize {
    4
}

const fn default_source_timeout_secs() -> u64 {
    15
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_fan_out: default_max_fan_out(),
            source_timeout_secs: default_source_timeout_secs(),
            focus: Vec::new(),
            sources: Vec::new(),
        }
    }
}

impl From<&ScannerConfig> for ScanSettings {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            max_fan_out: config.max_fan_out,
            source_timeout: Duration::from_secs(config.source_timeout_secs),
            focus: config.focus.clone(),
        }
    }
}

/// Risk-adjusted scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_risk_floor")]
    pub risk_floor: f64,
    /// Score given to non-positive returns.
    #[serde(default = "default_penalty")]
    pub penalty: f64,
}

const fn default_risk_floor() -> f64 {
    1.0
}

const fn default_penalty() -> f64 {
    -999.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            risk_floor: default_risk_floor(),
            penalty: default_penalty(),
        }
    }
}

impl From<ScoringConfig> for RiskAdjustedScorer {
    fn from(config: ScoringConfig) -> Self {
        Self {
            risk_floor: config.risk_floor,
            penalty: config.penalty,
        }
    }
}

/// Audit gate configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuditConfig {
    /// Overridden by `AGORA_AUDIT_MODE`.
    #[serde(default)]
    pub mode: AuditMode,
    /// Seconds to wait for an operator before denying (default: 300).
    #[serde(default = "default_audit_timeout_secs")]
    pub timeout_secs: u64,
    /// JSON-lines decision log.
    #[serde(default = "default_audit_log")]
    pub log: Option<PathBuf>,
}

const fn default_audit_timeout_secs() -> u64 {
    300
}

#[allow(clippy::unnecessary_wraps)]
fn default_audit_log() -> Option<PathBuf> {
    Some(PathBuf::from("data/audit.jsonl"))
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            mode: AuditMode::default(),
            timeout_secs: default_audit_timeout_secs(),
            log: default_audit_log(),
        }
    }
}

/// Enabled strategies and their parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StrategiesConfig {
    #[serde(default = "default_enabled_strategies")]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub trade: TradeConfig,
    #[serde(default)]
    pub arbitrage: ArbitrageConfig,
    #[serde(default)]
    pub freelance: FreelanceConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

fn default_enabled_strategies() -> Vec<String> {
    ["trade", "arbitrage", "freelance", "content"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for StrategiesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_strategies(),
            trade: TradeConfig::default(),
            arbitrage: ArbitrageConfig::default(),
            freelance: FreelanceConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

/// Episodic memory log.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MemoryConfig {
    /// JSON-lines file. Unset means outcomes are only logged.
    #[serde(default)]
    pub path: Option<PathBuf>,
}
