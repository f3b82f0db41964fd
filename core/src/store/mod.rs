//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The engine computes in memory; it calls store methods to read inputs
//! and to replace results, and never executes SQL directly.

use crate::{
    error::{UpliftError, UpliftResult},
    types::Day,
};
use rusqlite::Connection;

mod activity;
mod metric;
mod run;
mod uplift;

pub use run::RecomputeRunRecord;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct UpliftStore {
    conn: Connection,
}

impl UpliftStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> UpliftResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> UpliftResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> UpliftResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_inputs.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_activity_uplift.sql"))?;
        Ok(())
    }
}

fn format_day(day: Day) -> String {
    day.format(DATE_FORMAT).to_string()
}

fn parse_day(column: &'static str, value: &str) -> UpliftResult<Day> {
    Day::parse_from_str(value, DATE_FORMAT).map_err(|_| UpliftError::InvalidDate {
        column,
        value: value.to_string(),
    })
}
