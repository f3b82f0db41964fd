//! Lift calculator: observed post-window volume above the baseline.
//!
//! Window: [date, date + M − 1], M = `post_window_days`.
//! Each day contributes max(0, observed − baseline_avg) per metric; the
//! heuristic never assigns negative causal credit. These raw totals
//! over-credit whenever another activity on the same channel covers the
//! same day; `attribution` corrects for that.

use crate::{
    activity::{DailyMetric, MetricKind},
    baseline::BaselineEstimate,
    types::Day,
};
use chrono::Days;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLift {
    pub date:        Day,
    /// False when the channel has no metric row for this day.
    pub observed:    bool,
    pub signups:     Option<i64>,
    pub activations: Option<i64>,
    pub incremental_signups:     f64,
    pub incremental_activations: f64,
}

impl DailyLift {
    pub fn incremental(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Signups     => self.incremental_signups,
            MetricKind::Activations => self.incremental_activations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftEstimate {
    pub window_start:  Day,
    pub window_end:    Day,
    pub observed_days: usize,
    pub incremental_signups:     f64,
    pub incremental_activations: f64,
    pub daily: Vec<DailyLift>,
}

/// `(start, end)` of the post window for an activity on `date`.
/// None when the window is empty or runs past the calendar range.
pub fn post_window(date: Day, window_days: u32) -> Option<(Day, Day)> {
    if window_days == 0 {
        return None;
    }
    let end = date.checked_add_days(Days::new(u64::from(window_days) - 1))?;
    Some((date, end))
}

/// True when `day` falls inside the post window starting at `date`.
pub fn post_window_covers(date: Day, window_days: u32, day: Day) -> bool {
    post_window(date, window_days).is_some_and(|(start, end)| start <= day && day <= end)
}

/// Floored daily lift. Shared with the overlap resolver so a day with a
/// single contender reproduces the raw value bit for bit.
pub fn daily_incremental(observed: f64, baseline_avg: f64) -> f64 {
    (observed - baseline_avg).max(0.0)
}

/// Compute raw lift for one activity.
///
/// `series` must hold the activity's channel rows sorted by date ascending.
/// None when the post window cannot be formed.
pub fn calculate_lift(
    series:           &[DailyMetric],
    date:             Day,
    baseline:         &BaselineEstimate,
    post_window_days: u32,
) -> Option<LiftEstimate> {
    let (window_start, window_end) = post_window(date, post_window_days)?;
    let signups_base = baseline.avg(MetricKind::Signups);
    let activations_base = baseline.avg(MetricKind::Activations);

    let mut cursor = series.partition_point(|m| m.date < window_start);
    let mut daily = Vec::new();
    let mut incremental_signups = 0.0;
    let mut incremental_activations = 0.0;
    let mut observed_days = 0;

    let mut next = Some(window_start);
    while let Some(day) = next.filter(|d| *d <= window_end) {
        next = day.succ_opt();
        while cursor < series.len() && series[cursor].date < day {
            cursor += 1;
        }
        let entry = match series.get(cursor).filter(|m| m.date == day) {
            Some(row) => {
                observed_days += 1;
                let inc_s = daily_incremental(MetricKind::Signups.value_of(row), signups_base);
                let inc_a = daily_incremental(MetricKind::Activations.value_of(row), activations_base);
                incremental_signups += inc_s;
                incremental_activations += inc_a;
                DailyLift {
                    date: day,
                    observed: true,
                    signups: Some(row.signups),
                    activations: Some(row.activations),
                    incremental_signups: inc_s,
                    incremental_activations: inc_a,
                }
            }
            None => DailyLift {
                date: day,
                observed: false,
                signups: None,
                activations: None,
                incremental_signups: 0.0,
                incremental_activations: 0.0,
            },
        };
        daily.push(entry);
    }

    Some(LiftEstimate {
        window_start,
        window_end,
        observed_days,
        incremental_signups,
        incremental_activations,
        daily,
    })
}
