use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{ResourceClass, StrategyId, WorkerId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Treasury ledger errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("insufficient funds: balance {balance} cannot cover debit of {debit}")]
    InsufficientFunds { balance: Decimal, debit: Decimal },

    #[error("invalid ledger entry: {0}")]
    InvalidEntry(String),

    #[error("ledger store failure: {0}")]
    Store(String),
}

/// Resource budget errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BudgetError {
    #[error("budget exceeded for {class}: {spent} spent + {requested} requested > cap {cap}")]
    BudgetExceeded {
        class: ResourceClass,
        spent: Decimal,
        requested: Decimal,
        cap: Decimal,
    },

    #[error("no budget configured for resource class {0}")]
    UnknownClass(ResourceClass),
}

/// Strategy registry errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("strategy already registered: {0}")]
    DuplicateStrategy(StrategyId),

    #[error("strategy not found: {0}")]
    NotFound(StrategyId),
}

/// Worker lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkerError {
    #[error(transparent)]
    BudgetExceeded(#[from] BudgetError),

    #[error("failed to launch worker: {0}")]
    Launch(String),

    #[error("worker {worker_id} failed: {reason}")]
    Failure { worker_id: WorkerId, reason: String },

    #[error("worker {0} timed out")]
    Timeout(WorkerId),

    #[error("worker {0} was killed")]
    Killed(WorkerId),

    #[error("worker not found: {0}")]
    NotFound(WorkerId),

    #[error("worker spawn not authorized: {0}")]
    Denied(#[from] AuditError),
}

/// Opportunity source errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("source {source_id} unavailable: {reason}")]
    Unavailable { source_id: String, reason: String },

    #[error("source {0} timed out")]
    Timeout(String),

    #[error("source {source_id} returned malformed data: {reason}")]
    Malformed { source_id: String, reason: String },
}

/// Audit gate errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("operator denied: {0}")]
    Denied(String),

    #[error("approval timed out: {0}")]
    Timeout(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("strategy {strategy_id} failed: {reason}")]
    Strategy {
        strategy_id: StrategyId,
        reason: String,
    },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        // dialoguer::Error wraps an IO error
        Error::Io(std::io::Error::other(err.to_string()))
    }
}
