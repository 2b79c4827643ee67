//! Ledger entry types.
//!
//! A [`LedgerEntry`] is one immutable treasury-affecting event. The sign of
//! `amount` is authoritative: credits are positive, debits negative. The
//! category must agree with the sign (income credits, expenses debit,
//! transfers go either way).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::StrategyId;
use super::money::{to_fixed, Amount};
use crate::error::LedgerError;

/// Category of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerCategory {
    /// Revenue booked by a strategy.
    Income,
    /// Spend (infra, fees, generation cost).
    Expense,
    /// Operator deposit or withdrawal.
    Transfer,
}

impl LedgerCategory {
    /// Stable string form used for persistence.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl fmt::Display for LedgerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerCategory {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(LedgerError::InvalidEntry(format!(
                "unknown category '{other}'"
            ))),
        }
    }
}

/// A single committed (or about to be committed) treasury event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    /// Signed amount in currency units.
    pub amount: Amount,
    pub category: LedgerCategory,
    pub strategy_id: Option<StrategyId>,
    /// Free-form reference (opportunity id, worker id, operator note).
    pub reference: String,
}

impl LedgerEntry {
    /// Income credit; `amount` is the positive magnitude.
    pub fn income(amount: Amount, strategy_id: StrategyId, reference: impl Into<String>) -> Self {
        Self::new(amount.abs(), LedgerCategory::Income, Some(strategy_id), reference)
    }

    /// Expense debit; `amount` is the positive magnitude and is negated.
    pub fn expense(
        amount: Amount,
        strategy_id: Option<StrategyId>,
        reference: impl Into<String>,
    ) -> Self {
        Self::new(-amount.abs(), LedgerCategory::Expense, strategy_id, reference)
    }

    /// Operator transfer with an explicit sign (deposit > 0, withdrawal < 0).
    pub fn transfer(amount: Amount, reference: impl Into<String>) -> Self {
        Self::new(amount, LedgerCategory::Transfer, None, reference)
    }

    fn new(
        amount: Amount,
        category: LedgerCategory,
        strategy_id: Option<StrategyId>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            amount: to_fixed(amount),
            category,
            strategy_id,
            reference: reference.into(),
        }
    }

    /// Override the timestamp (replay and tests).
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// True when this entry reduces the balance.
    #[must_use]
    pub fn is_debit(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Check that the sign agrees with the category.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount.is_zero() {
            return Err(LedgerError::InvalidEntry("amount must be non-zero".into()));
        }
        match self.category {
            LedgerCategory::Income if self.is_debit() => Err(LedgerError::InvalidEntry(
                "income entries must be positive".into(),
            )),
            LedgerCategory::Expense if !self.is_debit() => Err(LedgerError::InvalidEntry(
                "expense entries must be negative".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Point-in-time view of the treasury handed to the decision loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasurySnapshot {
    pub balance: Amount,
    pub entry_count: usize,
    pub taken_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn expense_is_negated() {
        let entry = LedgerEntry::expense(dec!(1.50), None, "infra");
        assert_eq!(entry.amount, dec!(-1.50));
        assert!(entry.is_debit());
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn income_is_positive_even_when_given_negative() {
        let entry = LedgerEntry::income(dec!(-2), StrategyId::new("trade"), "opp-1");
        assert_eq!(entry.amount, dec!(2));
        assert!(!entry.is_debit());
    }

    #[test]
    fn zero_amount_is_invalid() {
        let entry = LedgerEntry::transfer(dec!(0), "noop");
        assert!(matches!(entry.validate(), Err(LedgerError::InvalidEntry(_))));
    }

    #[test]
    fn mismatched_sign_is_invalid() {
        let mut entry = LedgerEntry::income(dec!(1), StrategyId::new("trade"), "x");
        entry.amount = dec!(-1);
        assert!(entry.validate().is_err());
    }

    #[test]
    fn category_round_trips_through_str() {
        for category in [
            LedgerCategory::Income,
            LedgerCategory::Expense,
            LedgerCategory::Transfer,
        ] {
            assert_eq!(category.as_str().parse::<LedgerCategory>().unwrap(), category);
        }
        assert!("refund".parse::<LedgerCategory>().is_err());
    }
}
