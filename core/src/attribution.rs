//! Overlap resolver and proportional attribution.
//!
//! A channel-day has one observed incremental volume. When several
//! activities' post-windows cover that day the volume is split between
//! them by weight instead of being credited to each in full.
//!
//! RULES:
//!   - Work is always done per channel, over every report of that channel
//!     at once. An activity is never attributed in isolation.
//!   - A day with one contender credits that contender's raw daily lift,
//!     unchanged.
//!   - A contested day's incremental is measured against the baseline of
//!     its reference member (earliest date, then lowest id): that baseline
//!     predates every contender's effect.
//!   - Shares of a day always sum to 1; Σweights == 0 splits equally.

use crate::{
    activity::{Activity, DailyMetric, MetricKind},
    config::{PostWindowAttributionConfig, CLICKS_WEIGHT_FIELD},
    lift::{daily_incremental, post_window, DailyLift},
    report::UpliftReport,
    types::{ActivityId, Day},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Weights ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSource {
    Actual,
    Deterministic,
    Metadata,
    Default,
}

impl WeightSource {
    pub fn as_str(self) -> &'static str {
        match self {
            WeightSource::Actual        => "actual",
            WeightSource::Deterministic => "deterministic",
            WeightSource::Metadata      => "metadata",
            WeightSource::Default       => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedWeight {
    pub value:  f64,
    pub source: WeightSource,
}

fn usable(v: Option<f64>) -> Option<f64> {
    v.filter(|w| w.is_finite() && *w >= 0.0)
}

/// Pick an activity's attribution weight and record where it came from.
pub fn resolve_weight(activity: &Activity, cfg: &PostWindowAttributionConfig) -> ResolvedWeight {
    let found = if cfg.weight_field == CLICKS_WEIGHT_FIELD {
        usable(activity.actual_clicks)
            .map(|value| ResolvedWeight { value, source: WeightSource::Actual })
            .or_else(|| {
                usable(activity.deterministic_clicks)
                    .map(|value| ResolvedWeight { value, source: WeightSource::Deterministic })
            })
    } else {
        usable(activity.metadata_value(&cfg.weight_field))
            .map(|value| ResolvedWeight { value, source: WeightSource::Metadata })
    };

    found.unwrap_or(ResolvedWeight {
        value:  cfg.default_weight,
        source: WeightSource::Default,
    })
}

// ── Overlap detection ────────────────────────────────────────────────────────

/// For each activity, the other activities whose post-windows intersect its own.
///
/// `activities` must all belong to one channel. Two windows of length M
/// starting on a and b intersect iff |a − b| < M.
pub fn find_overlaps(
    activities:       &[&Activity],
    post_window_days: u32,
) -> BTreeMap<ActivityId, Vec<ActivityId>> {
    let reach = i64::from(post_window_days);
    let mut out: BTreeMap<ActivityId, Vec<ActivityId>> = BTreeMap::new();
    for a in activities {
        let others = activities
            .iter()
            .filter(|b| b.id != a.id)
            .filter(|b| (b.date - a.date).num_days().abs() < reach)
            .map(|b| b.id.clone())
            .collect();
        out.insert(a.id.clone(), others);
    }
    out
}

/// Days covered by the post-window of any channel activity other than `own_id`.
/// Feeds the `exclude_other_post_windows` baseline policy. A window that
/// runs past the calendar range covers nothing.
pub fn days_covered_by_others(
    activities:       &[&Activity],
    own_id:           &str,
    post_window_days: u32,
) -> BTreeSet<Day> {
    let mut days = BTreeSet::new();
    for other in activities.iter().filter(|a| a.id != own_id) {
        let Some((start, end)) = post_window(other.date, post_window_days) else {
            continue;
        };
        let mut next = Some(start);
        while let Some(day) = next.filter(|d| *d <= end) {
            days.insert(day);
            next = day.succ_opt();
        }
    }
    days
}

// ── Attribution records ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Only one activity covers the day.
    Sole,
    Weighted,
    /// Contested day whose weights sum to zero.
    Equal,
}

/// One activity's slice of one channel-day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyShare {
    pub date:       Day,
    pub contenders: usize,
    pub split:      SplitMode,
    pub share:      f64,
    pub reference_activity_id: ActivityId,
    pub channel_incremental_signups:     f64,
    pub channel_incremental_activations: f64,
    pub attributed_signups:     f64,
    pub attributed_activations: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostWindowAttribution {
    pub weight:        f64,
    pub weight_source: WeightSource,
    /// Post-window days shared with at least one other activity.
    pub overlap_days:  usize,
    pub attributed_signups:     f64,
    pub attributed_activations: f64,
    pub daily_shares:  Vec<DailyShare>,
}

// ── Resolver ─────────────────────────────────────────────────────────────────

/// Split every channel-day among the reports whose post-window covers it.
///
/// Non-mutating: returns new reports with `post_window_attribution` set.
/// Output order matches input order.
pub fn apply_proportional_attribution(
    reports: &[UpliftReport],
    metrics: &[DailyMetric],
    cfg:     &PostWindowAttributionConfig,
) -> Vec<UpliftReport> {
    let mut by_channel: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, report) in reports.iter().enumerate() {
        by_channel.entry(report.activity.channel.as_str()).or_default().push(i);
    }

    let mut resolved: Vec<Option<PostWindowAttribution>> = vec![None; reports.len()];
    for (channel, members) in &by_channel {
        // First row per day wins, matching the raw lift.
        let mut observed: BTreeMap<Day, &DailyMetric> = BTreeMap::new();
        for m in metrics.iter().filter(|m| m.channel == *channel) {
            observed.entry(m.date).or_insert(m);
        }
        let channel_reports: Vec<&UpliftReport> = members.iter().map(|&i| &reports[i]).collect();
        let attributed = resolve_channel(&channel_reports, &observed, cfg);
        for (&i, attribution) in members.iter().zip(attributed) {
            resolved[i] = Some(attribution);
        }
        log::debug!(
            "channel={channel} attributed {} activities",
            members.len()
        );
    }

    reports
        .iter()
        .zip(resolved)
        .map(|(report, attribution)| UpliftReport {
            post_window_attribution: attribution,
            ..report.clone()
        })
        .collect()
}

struct Accumulator {
    weight:       ResolvedWeight,
    overlap_days: usize,
    signups:      f64,
    activations:  f64,
    shares:       Vec<DailyShare>,
}

fn resolve_channel(
    reports:  &[&UpliftReport],
    observed: &BTreeMap<Day, &DailyMetric>,
    cfg:      &PostWindowAttributionConfig,
) -> Vec<PostWindowAttribution> {
    // day → (report index, that report's raw lift for the day)
    let mut coverage: BTreeMap<Day, Vec<(usize, &DailyLift)>> = BTreeMap::new();
    for (i, report) in reports.iter().enumerate() {
        for lift in &report.lift.daily {
            coverage.entry(lift.date).or_default().push((i, lift));
        }
    }

    let mut acc: Vec<Accumulator> = reports
        .iter()
        .map(|r| Accumulator {
            weight:       resolve_weight(&r.activity, cfg),
            overlap_days: 0,
            signups:      0.0,
            activations:  0.0,
            shares:       Vec::new(),
        })
        .collect();

    for (day, mut contenders) in coverage {
        contenders.sort_by(|(a, _), (b, _)| {
            let (ra, rb) = (&reports[*a].activity, &reports[*b].activity);
            ra.date.cmp(&rb.date).then_with(|| ra.id.cmp(&rb.id))
        });
        let (reference, reference_lift) = contenders[0];
        let reference_id = reports[reference].activity.id.clone();

        if contenders.len() == 1 {
            let a = &mut acc[reference];
            a.signups += reference_lift.incremental_signups;
            a.activations += reference_lift.incremental_activations;
            a.shares.push(DailyShare {
                date:       day,
                contenders: 1,
                split:      SplitMode::Sole,
                share:      1.0,
                reference_activity_id: reference_id,
                channel_incremental_signups:     reference_lift.incremental_signups,
                channel_incremental_activations: reference_lift.incremental_activations,
                attributed_signups:     reference_lift.incremental_signups,
                attributed_activations: reference_lift.incremental_activations,
            });
            continue;
        }

        let (inc_signups, inc_activations) = match observed.get(&day) {
            Some(row) => {
                let base = &reports[reference].baseline;
                (
                    daily_incremental(MetricKind::Signups.value_of(row), base.avg(MetricKind::Signups)),
                    daily_incremental(
                        MetricKind::Activations.value_of(row),
                        base.avg(MetricKind::Activations),
                    ),
                )
            }
            None => (0.0, 0.0),
        };

        let total: f64 = contenders.iter().map(|(i, _)| acc[*i].weight.value).sum();
        let n = contenders.len();
        let split = if total > 0.0 { SplitMode::Weighted } else { SplitMode::Equal };

        for (i, _) in &contenders {
            let share = match split {
                SplitMode::Weighted => acc[*i].weight.value / total,
                _ => 1.0 / n as f64,
            };
            let a = &mut acc[*i];
            let s = inc_signups * share;
            let v = inc_activations * share;
            a.signups += s;
            a.activations += v;
            a.overlap_days += 1;
            a.shares.push(DailyShare {
                date:       day,
                contenders: n,
                split,
                share,
                reference_activity_id: reference_id.clone(),
                channel_incremental_signups:     inc_signups,
                channel_incremental_activations: inc_activations,
                attributed_signups:     s,
                attributed_activations: v,
            });
        }
    }

    acc.into_iter()
        .map(|a| PostWindowAttribution {
            weight:        a.weight.value,
            weight_source: a.weight.source,
            overlap_days:  a.overlap_days,
            attributed_signups:     a.signups,
            attributed_activations: a.activations,
            daily_shares:  a.shares,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityStatus, ActivityType};
    use chrono::NaiveDate;

    fn activity(id: &str, day: u32) -> Activity {
        Activity {
            id: id.into(),
            activity_type: ActivityType::LinkedinPost,
            channel: "linkedin".into(),
            partner_name: "Acme".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            status: ActivityStatus::Published,
            cost_usd: None,
            deterministic_clicks: None,
            actual_clicks: None,
            deterministic_tracked_signups: None,
            metadata: None,
            content_url: None,
            channel_url: None,
            notes: None,
        }
    }

    #[test]
    fn weight_chain_prefers_actual_then_deterministic() {
        let cfg = PostWindowAttributionConfig::default();
        let mut a = activity("a", 1);
        assert_eq!(resolve_weight(&a, &cfg).source, WeightSource::Default);

        a.deterministic_clicks = Some(40.0);
        assert_eq!(resolve_weight(&a, &cfg), ResolvedWeight { value: 40.0, source: WeightSource::Deterministic });

        a.actual_clicks = Some(55.0);
        assert_eq!(resolve_weight(&a, &cfg), ResolvedWeight { value: 55.0, source: WeightSource::Actual });

        a.actual_clicks = Some(f64::NAN);
        assert_eq!(resolve_weight(&a, &cfg).source, WeightSource::Deterministic);
    }

    #[test]
    fn metadata_weight_field_falls_back_to_default() {
        let cfg = PostWindowAttributionConfig {
            weight_field: "impressions".into(),
            default_weight: 2.5,
            ..Default::default()
        };
        let mut a = activity("a", 1);
        a.actual_clicks = Some(99.0);
        assert_eq!(resolve_weight(&a, &cfg), ResolvedWeight { value: 2.5, source: WeightSource::Default });

        a.metadata = Some([("impressions".to_string(), 1800.0)].into_iter().collect());
        assert_eq!(resolve_weight(&a, &cfg), ResolvedWeight { value: 1800.0, source: WeightSource::Metadata });
    }

    #[test]
    fn overlaps_use_window_distance() {
        let (a, b, c) = (activity("a", 1), activity("b", 3), activity("c", 4));
        let overlaps = find_overlaps(&[&a, &b, &c], 3);
        assert_eq!(overlaps["a"], vec!["b".to_string()]);
        assert_eq!(overlaps["b"], vec!["a".to_string(), "c".to_string()]);
        assert_eq!(overlaps["c"], vec!["b".to_string()]);
    }

    #[test]
    fn covered_days_skip_own_window() {
        let (a, b) = (activity("a", 1), activity("b", 10));
        let days = days_covered_by_others(&[&a, &b], "b", 3);
        assert_eq!(days.len(), 3);
        assert!(days.contains(&NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()));
        assert!(!days.contains(&NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()));
    }
}
