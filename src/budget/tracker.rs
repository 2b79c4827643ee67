use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, DurationRound, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::{ResourceBudget, ResourceClass};
use crate::error::BudgetError;

/// Caps and period length for the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetLimits {
    /// Length of one budget period (e.g. one day).
    pub period: Duration,
    pub caps: BTreeMap<ResourceClass, Decimal>,
}

impl BudgetLimits {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            caps: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_cap(mut self, class: ResourceClass, cap: Decimal) -> Self {
        self.caps.insert(class, cap);
        self
    }
}

struct TrackerInner {
    period: Duration,
    budgets: Mutex<BTreeMap<ResourceClass, ResourceBudget>>,
}

impl TrackerInner {
    /// Start of the period containing `now`, aligned to the Unix epoch.
    fn period_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.duration_trunc(self.period).unwrap_or(now)
    }

    /// Reset `spent` if `budget` belongs to an older period. Outstanding
    /// reservations stay held.
    fn roll_over(&self, budget: &mut ResourceBudget, now: DateTime<Utc>) {
        let start = self.period_start(now);
        if budget.period_start < start {
            info!(
                class = %budget.class,
                spent = %budget.spent,
                cap = %budget.period_cap,
                "Budget period rolled over"
            );
            budget.period_start = start;
            budget.spent = Decimal::ZERO;
        }
    }

    fn settle(&self, class: ResourceClass, held: Decimal, used: Decimal) {
        let mut budgets = self.budgets.lock();
        let Some(budget) = budgets.get_mut(&class) else {
            return;
        };
        self.roll_over(budget, Utc::now());
        budget.reserved = (budget.reserved - held).max(Decimal::ZERO);
        if !class.is_capacity() {
            budget.spent += used;
        }
        debug!(
            class = %class,
            released = %(held - used),
            committed = %used,
            spent = %budget.spent,
            reserved = %budget.reserved,
            "Reservation settled"
        );
    }
}

/// Thread-safe tracker of per-class budgets. Cheap to clone.
#[derive(Clone)]
pub struct ResourceBudgetTracker {
    inner: Arc<TrackerInner>,
}

impl ResourceBudgetTracker {
    #[must_use]
    pub fn new(limits: BudgetLimits) -> Self {
        let now = Utc::now();
        let inner = TrackerInner {
            period: limits.period,
            budgets: Mutex::new(BTreeMap::new()),
        };
        let start = inner.period_start(now);
        {
            let mut budgets = inner.budgets.lock();
            for (class, cap) in limits.caps {
                budgets.insert(
                    class,
                    ResourceBudget {
                        class,
                        period_start: start,
                        period_cap: cap,
                        spent: Decimal::ZERO,
                        reserved: Decimal::ZERO,
                    },
                );
            }
        }
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Reserve `amount` of `class`, or refuse immediately.
    pub fn reserve(&self, class: ResourceClass, amount: Decimal) -> Result<Reservation, BudgetError> {
        self.reserve_at(class, amount, Utc::now())
    }

    /// Like [`reserve`](Self::reserve) with an explicit clock reading.
    pub fn reserve_at(
        &self,
        class: ResourceClass,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Reservation, BudgetError> {
        let amount = amount.max(Decimal::ZERO);
        let mut budgets = self.inner.budgets.lock();
        let budget = budgets
            .get_mut(&class)
            .ok_or(BudgetError::UnknownClass(class))?;
        self.inner.roll_over(budget, now);

        if budget.in_use() + amount > budget.period_cap {
            debug!(
                class = %class,
                in_use = %budget.in_use(),
                requested = %amount,
                cap = %budget.period_cap,
                "Reservation refused"
            );
            return Err(BudgetError::BudgetExceeded {
                class,
                spent: budget.in_use(),
                requested: amount,
                cap: budget.period_cap,
            });
        }

        budget.reserved += amount;
        Ok(Reservation {
            inner: Arc::clone(&self.inner),
            class,
            amount,
            settled: false,
        })
    }

    /// Current state of one class, rolled over to `now` if needed.
    #[must_use]
    pub fn budget(&self, class: ResourceClass) -> Option<ResourceBudget> {
        let mut budgets = self.inner.budgets.lock();
        let budget = budgets.get_mut(&class)?;
        self.inner.roll_over(budget, Utc::now());
        Some(budget.clone())
    }

    /// All configured budgets.
    #[must_use]
    pub fn budgets(&self) -> Vec<ResourceBudget> {
        let now = Utc::now();
        let mut budgets = self.inner.budgets.lock();
        budgets
            .values_mut()
            .map(|budget| {
                self.inner.roll_over(budget, now);
                budget.clone()
            })
            .collect()
    }
}

/// A held slice of one class's budget.
///
/// Dropping the reservation releases everything it holds. [`commit`](Self::commit)
/// charges the consumed part and releases the rest.
#[must_use = "dropping a reservation releases it immediately"]
pub struct Reservation {
    inner: Arc<TrackerInner>,
    class: ResourceClass,
    amount: Decimal,
    settled: bool,
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("class", &self.class)
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

impl Reservation {
    #[must_use]
    pub fn class(&self) -> ResourceClass {
        self.class
    }

    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Charge `used` (clamped to the reserved amount) and release the rest.
    /// Capacity classes are never charged. Returns the charged amount.
    pub fn commit(mut self, used: Decimal) -> Decimal {
        let used = if self.class.is_capacity() {
            Decimal::ZERO
        } else {
            used.clamp(Decimal::ZERO, self.amount)
        };
        self.inner.settle(self.class, self.amount, used);
        self.settled = true;
        used
    }

    /// Release without charging anything.
    pub fn release(mut self) {
        self.inner.settle(self.class, self.amount, Decimal::ZERO);
        self.settled = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.settle(self.class, self.amount, Decimal::ZERO);
        }
    }
}
