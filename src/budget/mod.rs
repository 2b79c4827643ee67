//! Resource budget accounting.
//!
//! Each [`ResourceClass`](crate::domain::ResourceClass) has a cap per fixed
//! period. Admission happens under one lock, so concurrent callers can never
//! jointly overshoot a cap. Reservations are scoped: dropping a
//! [`Reservation`] releases it.

mod tracker;

pub use tracker::{BudgetLimits, Reservation, ResourceBudgetTracker};
