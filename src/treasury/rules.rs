//! Profit routing rules.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::Amount;

/// Fractions that decide how profit is split and how much a cycle may spend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreasuryRules {
    /// Share of profit put back to work (0..=1).
    pub reinvest_fraction: Decimal,
    /// Share of the balance one cycle may spend on infrastructure (0..=1).
    pub max_infra_spend_fraction: Decimal,
}

impl Default for TreasuryRules {
    fn default() -> Self {
        Self {
            reinvest_fraction: dec!(0.70),
            max_infra_spend_fraction: dec!(0.10),
        }
    }
}

impl TreasuryRules {
    /// Portion of `profit` to reinvest, rounded to cents.
    #[must_use]
    pub fn reinvest_amount(&self, profit: Amount) -> Amount {
        (profit * self.reinvest_fraction).round_dp(2)
    }

    /// Whatever of `profit` is not reinvested.
    #[must_use]
    pub fn reserve_amount(&self, profit: Amount) -> Amount {
        profit - self.reinvest_amount(profit)
    }

    /// Maximum infrastructure spend for one cycle, rounded to cents.
    #[must_use]
    pub fn max_infra_budget(&self, balance: Amount) -> Amount {
        (balance.max(Decimal::ZERO) * self.max_infra_spend_fraction).round_dp(2)
    }
}
