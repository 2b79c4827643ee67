//! Resource budget types.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A consumable or capacity-limited resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// Wall-clock minutes of worker execution per period.
    WorkerMinutes,
    /// Number of workers alive at the same time.
    ConcurrentWorkers,
}

impl ResourceClass {
    /// Capacity classes hand their reservation back on release; nothing is
    /// ever "spent" from them.
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(self, Self::ConcurrentWorkers)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WorkerMinutes => "worker_minutes",
            Self::ConcurrentWorkers => "concurrent_workers",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Budget state for one resource class within the current period.
///
/// `spent + reserved <= period_cap` holds at every admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBudget {
    pub class: ResourceClass,
    pub period_start: DateTime<Utc>,
    pub period_cap: Decimal,
    /// Consumption committed in this period.
    pub spent: Decimal,
    /// Held by outstanding reservations.
    pub reserved: Decimal,
}

impl ResourceBudget {
    /// Amount still available for new reservations.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        (self.period_cap - self.spent - self.reserved).max(Decimal::ZERO)
    }

    /// Total currently counted against the cap.
    #[must_use]
    pub fn in_use(&self) -> Decimal {
        self.spent + self.reserved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn remaining_never_negative() {
        let budget = ResourceBudget {
            class: ResourceClass::WorkerMinutes,
            period_start: Utc::now(),
            period_cap: dec!(10),
            spent: dec!(8),
            reserved: dec!(4),
        };
        assert_eq!(budget.remaining(), Decimal::ZERO);
        assert_eq!(budget.in_use(), dec!(12));
    }

    #[test]
    fn only_concurrency_is_capacity() {
        assert!(ResourceClass::ConcurrentWorkers.is_capacity());
        assert!(!ResourceClass::WorkerMinutes.is_capacity());
    }
}
