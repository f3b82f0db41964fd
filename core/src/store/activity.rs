//! Store methods for activities.
//!
//! Metadata is kept as the raw JSON text the ingestion side wrote and is
//! parsed here, once, on the way out.

use crate::{
    activity::{parse_metadata_lenient, Activity, ActivityStatus, ActivityType},
    error::UpliftResult,
};
use rusqlite::params;

use super::{format_day, parse_day, UpliftStore};

struct ActivityRow {
    id:            String,
    activity_type: String,
    channel:       String,
    partner_name:  String,
    date:          String,
    status:        String,
    cost_usd:      Option<f64>,
    deterministic_clicks: Option<f64>,
    actual_clicks: Option<f64>,
    deterministic_tracked_signups: Option<f64>,
    metadata:      Option<String>,
    content_url:   Option<String>,
    channel_url:   Option<String>,
    notes:         Option<String>,
}

impl UpliftStore {
    pub fn insert_activity(&self, activity: &Activity) -> UpliftResult<()> {
        let metadata = activity
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.insert_activity_with_raw_metadata(activity, metadata.as_deref())
    }

    /// Insert with metadata exactly as received from the source system.
    /// `activity.metadata` is ignored.
    pub fn insert_activity_with_raw_metadata(
        &self,
        activity: &Activity,
        metadata: Option<&str>,
    ) -> UpliftResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO activity (
                id, activity_type, channel, partner_name, date, status,
                cost_usd, deterministic_clicks, actual_clicks,
                deterministic_tracked_signups, metadata, content_url,
                channel_url, notes
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                activity.id,
                activity.activity_type.as_str(),
                activity.channel,
                activity.partner_name,
                format_day(activity.date),
                activity.status.as_str(),
                activity.cost_usd,
                activity.deterministic_clicks,
                activity.actual_clicks,
                activity.deterministic_tracked_signups,
                metadata,
                activity.content_url,
                activity.channel_url,
                activity.notes,
            ],
        )?;
        Ok(())
    }

    /// All activities sorted by date ascending, then id.
    ///
    /// Rows with an unknown status are skipped with a warning; malformed
    /// metadata is dropped to `None`. Neither aborts the read.
    pub fn activities_by_date(&self) -> UpliftResult<Vec<Activity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, activity_type, channel, partner_name, date, status,
                    cost_usd, deterministic_clicks, actual_clicks,
                    deterministic_tracked_signups, metadata, content_url,
                    channel_url, notes
             FROM activity ORDER BY date ASC, id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ActivityRow {
                    id:            row.get(0)?,
                    activity_type: row.get(1)?,
                    channel:       row.get(2)?,
                    partner_name:  row.get(3)?,
                    date:          row.get(4)?,
                    status:        row.get(5)?,
                    cost_usd:      row.get(6)?,
                    deterministic_clicks: row.get(7)?,
                    actual_clicks: row.get(8)?,
                    deterministic_tracked_signups: row.get(9)?,
                    metadata:      row.get(10)?,
                    content_url:   row.get(11)?,
                    channel_url:   row.get(12)?,
                    notes:         row.get(13)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut activities = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(status) = ActivityStatus::parse(&row.status) else {
                log::warn!("activity {}: skipping unknown status '{}'", row.id, row.status);
                continue;
            };
            let metadata = parse_metadata_lenient(&row.id, row.metadata.as_deref());
            activities.push(Activity {
                activity_type: ActivityType::parse(&row.activity_type),
                date: parse_day("activity.date", &row.date)?,
                status,
                metadata,
                id:            row.id,
                channel:       row.channel,
                partner_name:  row.partner_name,
                cost_usd:      row.cost_usd,
                deterministic_clicks: row.deterministic_clicks,
                actual_clicks: row.actual_clicks,
                deterministic_tracked_signups: row.deterministic_tracked_signups,
                content_url:   row.content_url,
                channel_url:   row.channel_url,
                notes:         row.notes,
            });
        }
        Ok(activities)
    }

    pub fn activity_count(&self) -> UpliftResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM activity", [], |row| row.get(0))?;
        Ok(count)
    }
}
