//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::ledger_entries;

/// Database row for a ledger entry (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = ledger_entries)]
pub struct NewLedgerEntryRow {
    pub recorded_at: String,
    pub amount: String,
    pub category: String,
    pub strategy_id: Option<String>,
    pub reference: String,
}

/// Database row for a ledger entry (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = ledger_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LedgerEntryRow {
    pub seq: Option<i32>,
    pub recorded_at: String,
    pub amount: String,
    pub category: String,
    pub strategy_id: Option<String>,
    pub reference: String,
}
