//! Store methods for daily ground-truth metrics.

use crate::{activity::DailyMetric, error::UpliftResult};
use rusqlite::params;

use super::{format_day, parse_day, UpliftStore};

impl UpliftStore {
    /// One row per (date, channel); a re-delivered day overwrites the old row.
    pub fn insert_daily_metric(&self, metric: &DailyMetric) -> UpliftResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO daily_metric (date, channel, signups, activations)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                format_day(metric.date),
                metric.channel,
                metric.signups,
                metric.activations,
            ],
        )?;
        Ok(())
    }

    pub fn insert_daily_metrics(&self, metrics: &[DailyMetric]) -> UpliftResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for metric in metrics {
            self.insert_daily_metric(metric)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// All metrics sorted by date ascending, then channel.
    pub fn daily_metrics_by_date(&self) -> UpliftResult<Vec<DailyMetric>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, channel, signups, activations
             FROM daily_metric ORDER BY date ASC, channel ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(date, channel, signups, activations)| {
                Ok(DailyMetric {
                    date: parse_day("daily_metric.date", &date)?,
                    channel,
                    signups,
                    activations,
                })
            })
            .collect()
    }

    pub fn daily_metric_count(&self) -> UpliftResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM daily_metric", [], |row| row.get(0))?;
        Ok(count)
    }
}
