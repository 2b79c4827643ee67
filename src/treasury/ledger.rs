//! The treasury ledger.
//!
//! Every treasury-affecting event is appended here. The balance is the sum
//! of all committed signed amounts and never goes negative: the check, the
//! durable write, and the in-memory append happen under one lock, so two
//! concurrent debits cannot both pass against a balance only one of them
//! can satisfy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::store::{LedgerStore, MemoryLedgerStore};
use crate::domain::{Amount, LedgerCategory, LedgerEntry, StrategyId, TreasurySnapshot};
use crate::error::LedgerError;

struct LedgerState {
    entries: Vec<LedgerEntry>,
    balance: Amount,
}

/// Append-only treasury ledger with a derived running balance.
pub struct TreasuryLedger {
    store: Arc<dyn LedgerStore>,
    state: Mutex<LedgerState>,
}

impl TreasuryLedger {
    /// Open the ledger over `store`, replaying the full history.
    ///
    /// The balance is recomputed from the entries rather than trusted from
    /// any cached total. A history whose replay ever dips below zero is
    /// rejected as corrupt.
    pub fn open(store: Arc<dyn LedgerStore>) -> Result<Self, LedgerError> {
        let entries = store
            .load_all()
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        let mut balance = Amount::ZERO;
        for (index, entry) in entries.iter().enumerate() {
            balance += entry.amount;
            if balance.is_sign_negative() && !balance.is_zero() {
                return Err(LedgerError::Store(format!(
                    "replayed history drives balance negative at entry {index} ({balance})"
                )));
            }
        }

        info!(entries = entries.len(), balance = %balance, "Ledger loaded");
        Ok(Self {
            store,
            state: Mutex::new(LedgerState { entries, balance }),
        })
    }

    /// An empty ledger backed by a volatile store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryLedgerStore::new()),
            state: Mutex::new(LedgerState {
                entries: Vec::new(),
                balance: Amount::ZERO,
            }),
        }
    }

    /// Append one entry atomically.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] if a debit would drive
    /// the balance negative, and with [`LedgerError::Store`] if the entry
    /// could not be persisted. Nothing is applied on failure.
    pub fn record(&self, entry: LedgerEntry) -> Result<LedgerEntry, LedgerError> {
        entry.validate()?;

        let mut state = self.state.lock();
        let next = state.balance + entry.amount;
        if entry.is_debit() && next.is_sign_negative() && !next.is_zero() {
            warn!(
                balance = %state.balance,
                debit = %entry.amount,
                reference = %entry.reference,
                "Debit rejected: insufficient funds"
            );
            return Err(LedgerError::InsufficientFunds {
                balance: state.balance,
                debit: entry.amount.abs(),
            });
        }

        self.store
            .append(&entry)
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        state.balance = next;
        state.entries.push(entry.clone());
        debug!(
            category = %entry.category,
            amount = %entry.amount,
            balance = %state.balance,
            reference = %entry.reference,
            "Ledger entry committed"
        );
        Ok(entry)
    }

    /// Current signed total.
    #[must_use]
    pub fn balance(&self) -> Amount {
        self.state.lock().balance
    }

    /// True iff `balance() - amount >= 0`.
    #[must_use]
    pub fn can_afford(&self, amount: Amount) -> bool {
        self.balance() - amount.abs() >= Amount::ZERO
    }

    #[must_use]
    pub fn snapshot(&self) -> TreasurySnapshot {
        let state = self.state.lock();
        TreasurySnapshot {
            balance: state.balance,
            entry_count: state.entries.len(),
            taken_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries in commit order.
    #[must_use]
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.state.lock().entries.clone()
    }

    #[must_use]
    pub fn entries_for_strategy(&self, strategy_id: &StrategyId) -> Vec<LedgerEntry> {
        self.filtered(|e| e.strategy_id.as_ref() == Some(strategy_id))
    }

    /// Entries with `from <= timestamp < to`.
    #[must_use]
    pub fn entries_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<LedgerEntry> {
        self.filtered(|e| e.timestamp >= from && e.timestamp < to)
    }

    /// Net income minus expenses since `since` (transfers excluded).
    #[must_use]
    pub fn pnl(&self, since: Option<DateTime<Utc>>) -> Amount {
        self.total_income(since) - self.total_expenses(since)
    }

    #[must_use]
    pub fn total_income(&self, since: Option<DateTime<Utc>>) -> Amount {
        self.sum_category(LedgerCategory::Income, since)
    }

    /// Magnitude of all expense debits since `since`.
    #[must_use]
    pub fn total_expenses(&self, since: Option<DateTime<Utc>>) -> Amount {
        self.sum_category(LedgerCategory::Expense, since).abs()
    }

    fn sum_category(&self, category: LedgerCategory, since: Option<DateTime<Utc>>) -> Amount {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| e.category == category)
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
            .map(|e| e.amount)
            .sum()
    }

    fn filtered(&self, keep: impl Fn(&LedgerEntry) -> bool) -> Vec<LedgerEntry> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| keep(e))
            .cloned()
            .collect()
    }
}
