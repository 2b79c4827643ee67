//! Ledger persistence.
//!
//! The ledger calls its store while holding its commit lock, so store
//! operations are synchronous.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use super::database::model::{LedgerEntryRow, NewLedgerEntryRow};
use super::database::schema::ledger_entries;
use super::database::{create_pool, run_migrations, DbPool};
use crate::domain::{LedgerCategory, LedgerEntry, StrategyId};
use crate::error::{Error, Result};

/// Append-only storage for ledger entries.
pub trait LedgerStore: Send + Sync {
    /// Persist one entry. Must be durable when it returns `Ok`.
    fn append(&self, entry: &LedgerEntry) -> Result<()>;

    /// Load the full history in commit order.
    fn load_all(&self) -> Result<Vec<LedgerEntry>>;
}

/// Volatile store for tests and dry runs.
#[derive(Default)]
pub struct MemoryLedgerStore {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with existing history.
    #[must_use]
    pub fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn append(&self, entry: &LedgerEntry) -> Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.entries.lock().clone())
    }
}

/// SQLite-backed ledger store.
pub struct SqliteLedgerStore {
    pool: DbPool,
}

impl SqliteLedgerStore {
    /// Open (creating if needed) the database at `database_url` and run
    /// pending migrations.
    pub fn open(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url)?;
        run_migrations(&pool)?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn to_row(entry: &LedgerEntry) -> NewLedgerEntryRow {
        NewLedgerEntryRow {
            recorded_at: entry.timestamp.to_rfc3339(),
            amount: entry.amount.to_string(),
            category: entry.category.as_str().to_string(),
            strategy_id: entry.strategy_id.as_ref().map(ToString::to_string),
            reference: entry.reference.clone(),
        }
    }

    fn from_row(row: LedgerEntryRow) -> Result<LedgerEntry> {
        let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&row.recorded_at)
            .map_err(|e| Error::Parse(e.to_string()))?
            .with_timezone(&Utc);
        let amount = Decimal::from_str(&row.amount).map_err(|e| Error::Parse(e.to_string()))?;
        let category = LedgerCategory::from_str(&row.category)?;

        Ok(LedgerEntry {
            timestamp,
            amount,
            category,
            strategy_id: row.strategy_id.map(StrategyId::from),
            reference: row.reference,
        })
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn append(&self, entry: &LedgerEntry) -> Result<()> {
        let row = Self::to_row(entry);
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;

        diesel::insert_into(ledger_entries::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    fn load_all(&self) -> Result<Vec<LedgerEntry>> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;

        let rows: Vec<LedgerEntryRow> = ledger_entries::table
            .order(ledger_entries::seq.asc())
            .select(LedgerEntryRow::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn temp_store() -> (tempfile::TempDir, SqliteLedgerStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let store = SqliteLedgerStore::open(path.to_str().unwrap()).unwrap();
        (dir, store)
    }

    #[test]
    fn sqlite_store_preserves_order_and_precision() {
        let (_dir, store) = temp_store();
        let deposit = LedgerEntry::transfer(dec!(100.000001), "seed");
        let income = LedgerEntry::income(dec!(2.5), StrategyId::new("trade"), "pool-1");
        let expense = LedgerEntry::expense(dec!(0.25), None, "infra");

        store.append(&deposit).unwrap();
        store.append(&income).unwrap();
        store.append(&expense).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].amount, dec!(100.000001));
        assert_eq!(loaded[1].strategy_id, Some(StrategyId::new("trade")));
        assert_eq!(loaded[2].amount, dec!(-0.25));
        assert_eq!(loaded[2].category, LedgerCategory::Expense);
        assert_eq!(loaded[2].strategy_id, None);
    }

    #[test]
    fn sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let store = SqliteLedgerStore::open(path.to_str().unwrap()).unwrap();
            store
                .append(&LedgerEntry::transfer(dec!(10), "seed"))
                .unwrap();
        }
        let store = SqliteLedgerStore::open(path.to_str().unwrap()).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryLedgerStore::new();
        store
            .append(&LedgerEntry::transfer(dec!(1), "seed"))
            .unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);
    }
}
