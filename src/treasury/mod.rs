//! Treasury bookkeeping: the ledger, its persistence, and routing rules.

pub mod database;
mod ledger;
mod rules;
mod store;

pub use ledger::TreasuryLedger;
pub use rules::TreasuryRules;
pub use store::{LedgerStore, MemoryLedgerStore, SqliteLedgerStore};
