//! The recompute engine: the run boundary around the pure computation.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Validate config          (fatal on failure, nothing is read)
//!   2. Read activities + metrics from the store, sorted by date
//!   3. Baseline → Lift → Confidence per activity
//!   4. Proportional attribution per channel
//!   5. Map reports 1:1 to activity_uplift rows
//!   6. Replace the activity_uplift table in one transaction
//!
//! RULES:
//!   - Steps 3–5 are pure: no I/O, no randomness, no hidden state.
//!   - Step 6 runs only after 2–5 fully succeed. A failure anywhere leaves
//!     the previously persisted rows untouched.
//!   - Every invocation is recorded in recompute_run, succeeded or failed.

use crate::{
    activity::{Activity, DailyMetric},
    config::AttributionConfig,
    error::UpliftResult,
    report::{compute_all_reports, to_activity_uplifts, UpliftReport},
    store::UpliftStore,
    types::RunId,
};
use chrono::Utc;
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

/// What a trigger (scheduled job or manual recompute) reports back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeSummary {
    pub run_id:      RunId,
    pub count:       usize,
    pub duration_ms: u64,
    #[serde(skip)]
    pub reports:     Vec<UpliftReport>,
}

pub struct UpliftEngine {
    config: AttributionConfig,
}

impl UpliftEngine {
    /// Build an engine for one invocation. Rejects an invalid config up front.
    pub fn new(config: AttributionConfig) -> UpliftResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine with AttributionConfig::default_test().
    pub fn build_test() -> Self {
        Self { config: AttributionConfig::default_test() }
    }

    pub fn config(&self) -> &AttributionConfig {
        &self.config
    }

    /// Pure computation over in-memory inputs.
    pub fn compute(
        &self,
        activities: &[Activity],
        metrics:    &[DailyMetric],
    ) -> UpliftResult<Vec<UpliftReport>> {
        compute_all_reports(activities, metrics, &self.config)
    }

    /// Full recompute against `store`: read, compute, replace.
    pub fn recompute(&self, store: &UpliftStore) -> UpliftResult<RecomputeSummary> {
        let run_id = format!("recompute-{}", Uuid::new_v4());
        let started = Instant::now();
        store.insert_run(&run_id, &Utc::now().to_rfc3339())?;

        match self.recompute_inner(store) {
            Ok(reports) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                store.finish_run(
                    &run_id,
                    &Utc::now().to_rfc3339(),
                    "succeeded",
                    Some(reports.len()),
                    duration_ms,
                    None,
                )?;
                log::info!(
                    "run={run_id} recomputed {} activity uplifts in {duration_ms}ms",
                    reports.len()
                );
                Ok(RecomputeSummary {
                    run_id,
                    count: reports.len(),
                    duration_ms,
                    reports,
                })
            }
            Err(e) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                log::error!("run={run_id} recompute failed: {e}");
                if let Err(record_err) = store.finish_run(
                    &run_id,
                    &Utc::now().to_rfc3339(),
                    "failed",
                    None,
                    duration_ms,
                    Some(&e.to_string()),
                ) {
                    log::warn!("run={run_id} could not record failure: {record_err}");
                }
                Err(e)
            }
        }
    }

    fn recompute_inner(&self, store: &UpliftStore) -> UpliftResult<Vec<UpliftReport>> {
        let activities = store.activities_by_date()?;
        let metrics = store.daily_metrics_by_date()?;
        log::debug!(
            "loaded {} activities and {} daily metric rows",
            activities.len(),
            metrics.len()
        );

        let reports = self.compute(&activities, &metrics)?;
        let rows = to_activity_uplifts(&reports)?;
        store.replace_uplifts(&rows)?;
        Ok(reports)
    }
}
