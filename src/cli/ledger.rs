//! Handlers for the `ledger` command group.

use std::path::Path;

use rust_decimal::Decimal;
use tabled::Tabled;

use crate::app::open_ledger;
use crate::cli::output;
use crate::config::Config;
use crate::domain::{LedgerEntry, StrategyId};
use crate::error::{LedgerError, Result};
use crate::treasury::TreasuryLedger;

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Reference")]
    reference: String,
}

impl From<&LedgerEntry> for EntryRow {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            time: entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            category: entry.category.to_string(),
            amount: output::signed(entry.amount),
            strategy: entry
                .strategy_id
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            reference: entry.reference.clone(),
        }
    }
}

#[allow(clippy::result_large_err)]
fn load(config_path: &Path) -> Result<TreasuryLedger> {
    let config = Config::load(config_path)?;
    open_ledger(&config.treasury)
}

/// Execute `ledger balance`.
#[allow(clippy::result_large_err)]
pub fn execute_balance(config_path: &Path) -> Result<()> {
    let ledger = load(config_path)?;

    output::section("Treasury");
    output::key_value("Balance", ledger.balance());
    output::key_value("Entries", ledger.len());
    output::key_value("Income", ledger.total_income(None));
    output::key_value("Expenses", ledger.total_expenses(None));
    output::key_value("Net P&L", output::signed(ledger.pnl(None)));
    println!();
    Ok(())
}

/// Execute `ledger entries`.
#[allow(clippy::result_large_err)]
pub fn execute_entries(
    config_path: &Path,
    strategy: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let ledger = load(config_path)?;
    let entries = match strategy {
        Some(id) => ledger.entries_for_strategy(&StrategyId::new(id)),
        None => ledger.entries(),
    };

    let title = strategy.map_or_else(
        || "Ledger entries".to_string(),
        |id| format!("Ledger entries for {id}"),
    );
    output::section(&title);

    if entries.is_empty() {
        output::note("No entries.");
        return Ok(());
    }

    let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));
    output::table(entries.iter().skip(skip).map(EntryRow::from));
    println!();
    output::key_value("Shown", entries.len() - skip);
    output::key_value("Balance", ledger.balance());
    Ok(())
}

/// Execute `ledger deposit`.
#[allow(clippy::result_large_err)]
pub fn execute_deposit(config_path: &Path, amount: Decimal, reference: &str) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidEntry("deposit amount must be positive".into()).into());
    }

    let ledger = load(config_path)?;
    let entry = ledger.record(LedgerEntry::transfer(amount, reference))?;

    output::ok(&format!("Deposited {}", entry.amount));
    output::key_value("Balance", ledger.balance());
    Ok(())
}
