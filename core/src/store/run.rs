//! Store methods for recompute-run bookkeeping.

use crate::{
    error::{UpliftError, UpliftResult},
    types::RunId,
};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecomputeRunRecord {
    pub run_id:       RunId,
    pub started_at:   String,
    pub finished_at:  Option<String>,
    pub status:       String,
    pub uplift_count: Option<i64>,
    pub duration_ms:  Option<i64>,
    pub error:        Option<String>,
}

impl super::UpliftStore {
    pub fn insert_run(&self, run_id: &str, started_at: &str) -> UpliftResult<()> {
        self.conn.execute(
            "INSERT INTO recompute_run (run_id, started_at, status) VALUES (?1, ?2, 'running')",
            params![run_id, started_at],
        )?;
        Ok(())
    }

    /// Close a run as `succeeded` or `failed`.
    pub fn finish_run(
        &self,
        run_id:       &str,
        finished_at:  &str,
        status:       &str,
        uplift_count: Option<usize>,
        duration_ms:  u64,
        error:        Option<&str>,
    ) -> UpliftResult<()> {
        let updated = self.conn.execute(
            "UPDATE recompute_run
             SET finished_at = ?2, status = ?3, uplift_count = ?4, duration_ms = ?5, error = ?6
             WHERE run_id = ?1",
            params![
                run_id,
                finished_at,
                status,
                uplift_count.map(|n| n as i64),
                duration_ms as i64,
                error,
            ],
        )?;
        if updated == 0 {
            return Err(UpliftError::RunNotFound { run_id: run_id.to_string() });
        }
        Ok(())
    }

    pub fn run(&self, run_id: &str) -> UpliftResult<Option<RecomputeRunRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT run_id, started_at, finished_at, status, uplift_count, duration_ms, error
                 FROM recompute_run WHERE run_id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Most recently started run, in insertion order.
    pub fn latest_run(&self) -> UpliftResult<Option<RecomputeRunRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT run_id, started_at, finished_at, status, uplift_count, duration_ms, error
                 FROM recompute_run ORDER BY rowid DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(record)
    }
}

fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecomputeRunRecord> {
    Ok(RecomputeRunRecord {
        run_id:       row.get(0)?,
        started_at:   row.get(1)?,
        finished_at:  row.get(2)?,
        status:       row.get(3)?,
        uplift_count: row.get(4)?,
        duration_ms:  row.get(5)?,
        error:        row.get(6)?,
    })
}
