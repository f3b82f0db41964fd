//! Report aggregator: baseline → lift → confidence per activity, then
//! per-channel attribution, merged into one ordered list.
//!
//! Ordering is fixed: channel (lexicographic), then activity date, then id.
//! The persistence collaborator maps the list 1:1 into `activity_uplift`.

use crate::{
    activity::{Activity, DailyMetric},
    attribution::{apply_proportional_attribution, days_covered_by_others, find_overlaps, PostWindowAttribution},
    baseline::{estimate_baseline, BaselineEstimate, MetricStats},
    config::{AttributionConfig, BaselinePolicy},
    confidence::{score_confidence, window_out_of_range, Confidence},
    error::UpliftResult,
    lift::{calculate_lift, DailyLift, LiftEstimate},
    types::{ActivityId, Day},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpliftReport {
    pub activity: Activity,
    pub baseline: BaselineEstimate,
    /// Baseline average of the configured primary metric.
    pub baseline_avg: f64,
    pub lift: LiftEstimate,
    pub overlapping_activity_ids: Vec<ActivityId>,
    pub confidence: Confidence,
    pub confidence_explanation: String,
    /// None until attribution has run, or when it is disabled.
    pub post_window_attribution: Option<PostWindowAttribution>,
}

impl UpliftReport {
    pub fn baseline_window_start(&self) -> Day {
        self.baseline.window_start
    }

    pub fn baseline_window_end(&self) -> Day {
        self.baseline.window_end
    }

    /// Raw incremental signups.
    pub fn incremental(&self) -> f64 {
        self.lift.incremental_signups
    }

    pub fn incremental_activations(&self) -> f64 {
        self.lift.incremental_activations
    }

    pub fn daily_data(&self) -> &[DailyLift] {
        &self.lift.daily
    }

    /// Attributed signups; equals the raw value when attribution did not run.
    pub fn attributed_signups(&self) -> f64 {
        self.post_window_attribution
            .as_ref()
            .map_or(self.incremental(), |a| a.attributed_signups)
    }

    pub fn attributed_activations(&self) -> f64 {
        self.post_window_attribution
            .as_ref()
            .map_or(self.incremental_activations(), |a| a.attributed_activations)
    }

    /// Spend per attributed signup, when cost is known and credit is positive.
    pub fn cost_per_attributed_signup(&self) -> Option<f64> {
        let cost = self.activity.cost_usd?;
        let signups = self.attributed_signups();
        (signups > 0.0).then(|| cost / signups)
    }
}

/// Compute every eligible activity's report.
///
/// Fails only on an invalid config, before any computation. Anomalous data
/// for one activity lowers its confidence; it never aborts the batch.
/// Duplicate `(date, channel)` metric rows keep the first row seen.
pub fn compute_all_reports(
    activities: &[Activity],
    metrics:    &[DailyMetric],
    config:     &AttributionConfig,
) -> UpliftResult<Vec<UpliftReport>> {
    config.validate()?;

    let mut series: BTreeMap<&str, Vec<DailyMetric>> = BTreeMap::new();
    for m in metrics {
        series.entry(m.channel.as_str()).or_default().push(m.clone());
    }
    for (channel, rows) in series.iter_mut() {
        rows.sort_by_key(|m| m.date);
        let before = rows.len();
        rows.dedup_by_key(|m| m.date);
        if rows.len() < before {
            log::warn!(
                "channel={channel} dropped {} duplicate daily metric rows; first row per day kept",
                before - rows.len()
            );
        }
    }

    let mut channels: BTreeMap<&str, Vec<&Activity>> = BTreeMap::new();
    for a in activities.iter().filter(|a| a.is_eligible()) {
        channels.entry(a.channel.as_str()).or_default().push(a);
    }

    let no_rows: Vec<DailyMetric> = Vec::new();
    let mut reports = Vec::with_capacity(activities.len());
    for (channel, mut group) in channels {
        group.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        let rows = series.get(channel).unwrap_or(&no_rows);
        if rows.is_empty() {
            log::warn!("channel={channel} has no daily metrics; {} activities get zero lift", group.len());
        }

        let overlaps = find_overlaps(&group, config.post_window_days);
        for activity in &group {
            let overlapping = overlaps.get(&activity.id).cloned().unwrap_or_default();
            reports.push(build_raw_report(activity, rows, &group, overlapping, config));
        }
        log::debug!("channel={channel} raw reports built for {} activities", group.len());
    }

    if config.post_window_attribution.enabled {
        let deduped: Vec<DailyMetric> = series.into_values().flatten().collect();
        Ok(apply_proportional_attribution(&reports, &deduped, &config.post_window_attribution))
    } else {
        Ok(reports)
    }
}

fn build_raw_report(
    activity:    &Activity,
    rows:        &[DailyMetric],
    channel:     &[&Activity],
    overlapping: Vec<ActivityId>,
    config:      &AttributionConfig,
) -> UpliftReport {
    let excluded = match config.baseline_policy {
        BaselinePolicy::Include => BTreeSet::new(),
        BaselinePolicy::ExcludeOtherPostWindows => {
            days_covered_by_others(channel, &activity.id, config.post_window_days)
        }
    };
    let windows = estimate_baseline(rows, activity.date, config.baseline_window_days, &excluded)
        .and_then(|baseline| {
            calculate_lift(rows, activity.date, &baseline, config.post_window_days)
                .map(|lift| (baseline, lift))
        });
    let Some((baseline, lift)) = windows else {
        log::warn!(
            "activity={} date={} windows fall outside the calendar range; reporting zero lift",
            activity.id,
            activity.date
        );
        return out_of_range_report(activity, overlapping, config);
    };
    let grade = score_confidence(
        &baseline,
        config.primary_metric,
        overlapping.len(),
        &config.confidence,
    );

    UpliftReport {
        activity: activity.clone(),
        baseline_avg: baseline.avg(config.primary_metric),
        baseline,
        lift,
        overlapping_activity_ids: overlapping,
        confidence: grade.confidence,
        confidence_explanation: grade.explanation,
        post_window_attribution: None,
    }
}

/// Zero-lift report for an activity whose windows cannot be formed.
/// Both windows collapse onto the activity date.
fn out_of_range_report(
    activity:    &Activity,
    overlapping: Vec<ActivityId>,
    config:      &AttributionConfig,
) -> UpliftReport {
    let grade = window_out_of_range(activity.date, overlapping.len());
    UpliftReport {
        activity: activity.clone(),
        baseline: BaselineEstimate {
            window_start:  activity.date,
            window_end:    activity.date,
            expected_days: config.baseline_window_days as usize,
            data_days:     0,
            excluded_days: 0,
            signups:       MetricStats::default(),
            activations:   MetricStats::default(),
        },
        baseline_avg: 0.0,
        lift: LiftEstimate {
            window_start:  activity.date,
            window_end:    activity.date,
            observed_days: 0,
            incremental_signups:     0.0,
            incremental_activations: 0.0,
            daily: Vec::new(),
        },
        overlapping_activity_ids: overlapping,
        confidence: grade.confidence,
        confidence_explanation: grade.explanation,
        post_window_attribution: None,
    }
}

// ── Persisted row ────────────────────────────────────────────────────────────

/// One `activity_uplift` row. Written only through a full-table replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityUplift {
    pub activity_id:           ActivityId,
    pub baseline_window_start: Day,
    pub baseline_window_end:   Day,
    pub baseline_avg:          f64,
    pub raw_incremental_signups:            f64,
    pub raw_incremental_activations:        f64,
    pub attributed_incremental_signups:     f64,
    pub attributed_incremental_activations: f64,
    pub clicks_used:   Option<f64>,
    pub clicks_source: Option<String>,
    pub confidence:    Confidence,
    pub confidence_explanation: String,
    pub daily_shares_json: String,
    pub daily_data_json:   String,
}

impl ActivityUplift {
    pub fn from_report(report: &UpliftReport) -> UpliftResult<Self> {
        let attribution = report.post_window_attribution.as_ref();
        let daily_shares_json = match attribution {
            Some(a) => serde_json::to_string(&a.daily_shares)?,
            None => "[]".to_string(),
        };
        Ok(Self {
            activity_id:           report.activity.id.clone(),
            baseline_window_start: report.baseline_window_start(),
            baseline_window_end:   report.baseline_window_end(),
            baseline_avg:          report.baseline_avg,
            raw_incremental_signups:            report.incremental(),
            raw_incremental_activations:        report.incremental_activations(),
            attributed_incremental_signups:     report.attributed_signups(),
            attributed_incremental_activations: report.attributed_activations(),
            clicks_used:   attribution.map(|a| a.weight),
            clicks_source: attribution.map(|a| a.weight_source.as_str().to_string()),
            confidence:    report.confidence,
            confidence_explanation: report.confidence_explanation.clone(),
            daily_shares_json,
            daily_data_json: serde_json::to_string(report.daily_data())?,
        })
    }
}

/// Map a full report list into rows, preserving order.
pub fn to_activity_uplifts(reports: &[UpliftReport]) -> UpliftResult<Vec<ActivityUplift>> {
    reports.iter().map(ActivityUplift::from_report).collect()
}
