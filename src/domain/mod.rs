//! Core domain types shared by every component.

pub mod id;
pub mod ledger;
pub mod money;
pub mod opportunity;
pub mod outcome;
pub mod resource;
pub mod worker;

pub use id::{OpportunityId, StrategyId, WorkerId};
pub use ledger::{LedgerCategory, LedgerEntry, TreasurySnapshot};
pub use money::{to_cents, to_fixed, Amount};
pub use opportunity::{
    Opportunity, OpportunityKind, OpportunityRef, RawOpportunity, ScoredOpportunity,
};
pub use outcome::Outcome;
pub use resource::{ResourceBudget, ResourceClass};
pub use worker::{ResourceRequest, TaskPayload, Worker, WorkerOutcome, WorkerStatus};
