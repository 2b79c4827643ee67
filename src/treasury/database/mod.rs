//! SQLite persistence for the treasury ledger.

pub mod connection;
pub mod model;
pub mod schema;

pub use connection::{create_pool, run_migrations, DbPool};
