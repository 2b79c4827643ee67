//! Ledger database connections.
//!
//! The ledger appends under its own commit lock, so one pooled connection
//! is enough and keeps a single writer on the file. Every connection the
//! pool hands out has the ledger pragmas applied: an acknowledged append
//! must survive a crash, and a concurrent `check ledger` reader must not
//! block the agent's writes.

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{Error, Result};

/// Embedded database migrations compiled from the migrations/ directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Pool of ledger connections.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// How long a write waits on another process's lock before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Applies the ledger's durability pragmas on every acquire.
#[derive(Debug, Clone, Copy)]
struct LedgerPragmas;

impl LedgerPragmas {
    fn statements() -> String {
        format!(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = FULL; \
             PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
        )
    }
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for LedgerPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&Self::statements())
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Open a single-writer pool on the ledger database at `database_url`.
///
/// # Errors
/// Returns an error if the database cannot be opened or a pragma is rejected.
pub fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(1)
        .connection_customizer(Box::new(LedgerPragmas))
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Bring the ledger schema up to date.
///
/// # Errors
/// Returns an error if migrations fail.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Connection(e.to_string()))?;
    Ok(())
}
