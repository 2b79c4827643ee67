//! Agora - an autonomous economic agent.
//!
//! The agent repeatedly checks its treasury, scans opportunity sources,
//! ranks what it finds, and hands the best match to a revenue strategy.
//! Every irreversible effect (ledger commits, worker spawns, strategy
//! execution) passes through an audit gate that can require a human
//! approval.
//!
//! # Modules
//!
//! - [`agent`] - The decision loop state machine, selection and memory
//! - [`treasury`] - Append-only ledger with SQLite persistence
//! - [`budget`] - Per-period resource caps with scoped reservations
//! - [`worker`] - Isolated, budgeted execution units
//! - [`strategy`] - Strategy trait, registry and built-in strategies
//! - [`scanner`] - Source connectors, scoring and ranking
//! - [`audit`] - Human-in-the-loop approval gate
//! - [`config`] - Configuration loading from TOML files
//! - [`app`] - Wiring configuration into a running agent
//! - [`cli`] - Command-line interface
//! - [`domain`] - Shared types: money, ids, opportunities, outcomes
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use agora::app::App;
//! use agora::config::Config;
//!
//! # async fn run() -> agora::error::Result<()> {
//! let config = Config::load("agora.toml")?;
//! config.init_logging();
//! let app = App::build(&config, Some(1))?;
//! app.run().await;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod app;
pub mod audit;
pub mod budget;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod scanner;
pub mod strategy;
pub mod treasury;
pub mod worker;
