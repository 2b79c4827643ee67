//! Monetary types for treasury amounts.

use rust_decimal::{Decimal, RoundingStrategy};

/// Currency amount represented as a Decimal for precision.
///
/// Positive amounts credit the treasury, negative amounts debit it.
pub type Amount = Decimal;

/// Number of fractional digits kept for booked amounts (micro-units).
pub const AMOUNT_SCALE: u32 = 6;

/// Normalize an amount to the fixed booking scale.
#[must_use]
pub fn to_fixed(amount: Amount) -> Amount {
    amount
        .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Round an amount to whole cents.
#[must_use]
pub fn to_cents(amount: Amount) -> Amount {
    amount.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}
