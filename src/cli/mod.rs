//! Command-line interface definitions.

pub mod check;
pub mod ledger;
pub mod output;
pub mod run;
pub mod strategies;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Agora - an autonomous economic agent.
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the decision loop (foreground, until Ctrl-C)
    Run(RunArgs),

    /// Inspect or fund the treasury ledger
    #[command(subcommand)]
    Ledger(LedgerCommand),

    /// List built-in strategies
    Strategies,

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `agora ledger`
#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Show the balance recomputed from every entry
    Balance(ConfigPathArg),
    /// List ledger entries
    Entries(EntriesArgs),
    /// Record an operator transfer into the treasury
    Deposit(DepositArgs),
}

/// Subcommands for `agora check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
    /// Fetch every configured opportunity source once
    Sources(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "agora.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "agora.toml")]
    pub config: PathBuf,

    /// Require operator approval before every irreversible action
    #[arg(long)]
    pub audit: bool,

    /// Keep the ledger in memory; nothing is persisted
    #[arg(long)]
    pub dry_run: bool,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Stop after this many cycles
    #[arg(long)]
    pub max_cycles: Option<u64>,
}

/// Arguments for `agora ledger entries`.
#[derive(Parser, Debug)]
pub struct EntriesArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "agora.toml")]
    pub config: PathBuf,

    /// Only entries attributed to this strategy
    #[arg(long)]
    pub strategy: Option<String>,

    /// Show at most this many of the most recent entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Arguments for `agora ledger deposit`.
#[derive(Parser, Debug)]
pub struct DepositArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "agora.toml")]
    pub config: PathBuf,

    /// Amount to credit, in dollars
    pub amount: Decimal,

    /// Reference stored with the entry
    #[arg(long, default_value = "operator deposit")]
    pub reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "agora",
            "run",
            "--audit",
            "--dry-run",
            "--max-cycles",
            "3",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.audit);
        assert!(args.dry_run);
        assert_eq!(args.max_cycles, Some(3));
        assert_eq!(args.config, PathBuf::from("agora.toml"));
    }

    #[test]
    fn deposit_takes_amount() {
        let cli = Cli::parse_from(["agora", "ledger", "deposit", "25.50"]);
        let Commands::Ledger(LedgerCommand::Deposit(args)) = cli.command else {
            panic!("expected deposit");
        };
        assert_eq!(args.amount, dec!(25.50));
    }
}
