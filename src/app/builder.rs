//! Assembles the agent's collaborators from configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

use crate::agent::{JsonlMemorySink, MemorySink, TopRankedSelector, TracingMemorySink};
use crate::audit::{AuditGate, AuditLog, ConsoleApproval};
use crate::config::{
    Config, MemoryConfig, ScannerConfig, SourceConfig, StrategiesConfig, TreasuryConfig,
};
use crate::error::Result;
use crate::scanner::{
    FileSource, HttpSource, RiskAdjustedScorer, Scanner, SourceConnector, StaticSource,
};
use crate::strategy::{
    ArbitrageStrategy, ContentStrategy, FreelanceStrategy, Strategy, StrategyRegistry,
    TradeStrategy,
};
use crate::treasury::{SqliteLedgerStore, TreasuryLedger};

/// Open the persisted ledger, creating the database directory if needed.
#[allow(clippy::result_large_err)]
pub fn open_ledger(config: &TreasuryConfig) -> Result<TreasuryLedger> {
    if let Some(parent) = Path::new(&config.database).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = SqliteLedgerStore::open(&config.database)?;
    Ok(TreasuryLedger::open(Arc::new(store))?)
}

/// Persisted ledger, or a volatile one in dry-run mode.
#[allow(clippy::result_large_err)]
pub(crate) fn ledger_for(config: &Config) -> Result<TreasuryLedger> {
    if config.dry_run {
        info!("Dry-run mode: ledger is in memory and will not be persisted");
        return Ok(TreasuryLedger::in_memory());
    }
    open_ledger(&config.treasury)
}

/// Register the enabled strategies in configuration order.
#[allow(clippy::result_large_err)]
pub fn build_strategy_registry(config: &StrategiesConfig) -> Result<StrategyRegistry> {
    let mut builder = StrategyRegistry::builder();

    for name in &config.enabled {
        let strategy: Arc<dyn Strategy> = match name.as_str() {
            "trade" => Arc::new(TradeStrategy::new(config.trade.clone())),
            "arbitrage" => Arc::new(ArbitrageStrategy::new(config.arbitrage.clone())),
            "freelance" => Arc::new(FreelanceStrategy::new(config.freelance.clone())),
            "content" => Arc::new(ContentStrategy::new(config.content.clone())),
            unknown => {
                warn!(strategy = unknown, "Unknown strategy in config, skipping");
                continue;
            }
        };
        builder.register(strategy)?;
    }

    Ok(builder.build())
}

/// Connector for one configured source.
#[allow(clippy::result_large_err)]
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn SourceConnector>> {
    let source: Arc<dyn SourceConnector> = match config {
        SourceConfig::File { name, path } => Arc::new(FileSource::new(name, path)),
        SourceConfig::Http { name, url } => Arc::new(HttpSource::new(name, Url::parse(url)?)),
        SourceConfig::Static { name, records } => {
            Arc::new(StaticSource::new(name, records.clone()))
        }
    };
    Ok(source)
}

/// Scanner over every configured source.
#[allow(clippy::result_large_err)]
pub(crate) fn build_scanner(
    scanner: &ScannerConfig,
    scorer: RiskAdjustedScorer,
) -> Result<Scanner> {
    let mut built = Scanner::new(Arc::new(scorer), scanner.into());
    for source in &scanner.sources {
        built = built.with_source(build_source(source)?);
    }
    if built.source_count() == 0 {
        warn!("No opportunity sources configured; every cycle will be empty");
    }
    Ok(built)
}

pub(crate) fn build_gate(config: &Config, shutdown: watch::Receiver<bool>) -> Result<AuditGate> {
    let gate = AuditGate::new(
        config.audit.mode,
        Duration::from_secs(config.audit.timeout_secs),
        Arc::new(ConsoleApproval::new()?),
    )
    .with_shutdown(shutdown);

    Ok(match &config.audit.log {
        Some(path) => gate.with_log(AuditLog::new(path)),
        None => gate,
    })
}

pub(crate) fn build_memory(config: &MemoryConfig) -> Arc<dyn MemorySink> {
    match &config.path {
        Some(path) => Arc::new(JsonlMemorySink::new(path)),
        None => Arc::new(TracingMemorySink),
    }
}

pub(crate) fn build_selector(config: &Config) -> TopRankedSelector {
    TopRankedSelector::new(config.agent.min_score)
}
