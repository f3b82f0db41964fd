//! Store methods for the engine-owned `activity_uplift` table.
//!
//! RULE: the table is only ever replaced as a whole, inside one
//! transaction. A failed replace rolls back and leaves the previous
//! rows exactly as they were.

use crate::{
    confidence::Confidence,
    error::UpliftResult,
    report::ActivityUplift,
};
use rusqlite::params;

use super::{format_day, parse_day, UpliftStore};

impl UpliftStore {
    /// Delete every row and insert `rows` atomically. Returns rows written.
    pub fn replace_uplifts(&self, rows: &[ActivityUplift]) -> UpliftResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM activity_uplift", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO activity_uplift (
                    activity_id, baseline_window_start, baseline_window_end,
                    baseline_avg, raw_incremental_signups, raw_incremental_activations,
                    attributed_incremental_signups, attributed_incremental_activations,
                    clicks_used, clicks_source, confidence, confidence_explanation,
                    daily_shares_json, daily_data_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.activity_id,
                    format_day(row.baseline_window_start),
                    format_day(row.baseline_window_end),
                    row.baseline_avg,
                    row.raw_incremental_signups,
                    row.raw_incremental_activations,
                    row.attributed_incremental_signups,
                    row.attributed_incremental_activations,
                    row.clicks_used,
                    row.clicks_source,
                    row.confidence.as_str(),
                    row.confidence_explanation,
                    row.daily_shares_json,
                    row.daily_data_json,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Every persisted row, ordered by activity id.
    pub fn uplifts(&self) -> UpliftResult<Vec<ActivityUplift>> {
        let mut stmt = self.conn.prepare(
            "SELECT activity_id, baseline_window_start, baseline_window_end,
                    baseline_avg, raw_incremental_signups, raw_incremental_activations,
                    attributed_incremental_signups, attributed_incremental_activations,
                    clicks_used, clicks_source, confidence, confidence_explanation,
                    daily_shares_json, daily_data_json
             FROM activity_uplift ORDER BY activity_id ASC",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    (
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, f64>(6)?,
                    ),
                    (
                        row.get::<_, f64>(7)?,
                        row.get::<_, Option<f64>>(8)?,
                        row.get::<_, Option<String>>(9)?,
                        row.get::<_, String>(10)?,
                        row.get::<_, String>(11)?,
                        row.get::<_, String>(12)?,
                        row.get::<_, String>(13)?,
                    ),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|((id, start, end, avg, raw_s, raw_a, attr_s), (attr_a, clicks, source, conf, expl, shares, data))| {
                Ok(ActivityUplift {
                    activity_id:           id,
                    baseline_window_start: parse_day("activity_uplift.baseline_window_start", &start)?,
                    baseline_window_end:   parse_day("activity_uplift.baseline_window_end", &end)?,
                    baseline_avg:          avg,
                    raw_incremental_signups:            raw_s,
                    raw_incremental_activations:        raw_a,
                    attributed_incremental_signups:     attr_s,
                    attributed_incremental_activations: attr_a,
                    clicks_used:   clicks,
                    clicks_source: source,
                    confidence:    conf.parse::<Confidence>()?,
                    confidence_explanation: expl,
                    daily_shares_json: shares,
                    daily_data_json:   data,
                })
            })
            .collect()
    }

    pub fn uplift_count(&self) -> UpliftResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM activity_uplift", [], |row| row.get(0))?;
        Ok(count)
    }
}
