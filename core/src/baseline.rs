//! Baseline estimator: the organic metric level just before an activity.
//!
//! Window: [date − N, date − 1], N = `baseline_window_days`.
//! Missing days are skipped, never zero-filled. A thin window still yields
//! an estimate; `data_days` / `expected_days` let the confidence scorer
//! flag it instead of aborting.

use crate::{
    activity::{DailyMetric, MetricKind},
    types::Day,
};
use chrono::Days;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricStats {
    pub avg:     f64,
    /// Population standard deviation over the days with data.
    pub std_dev: f64,
}

impl MetricStats {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let avg = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n;
        Self { avg, std_dev: variance.sqrt() }
    }

    /// Coefficient of variation. Zero for an all-zero series.
    pub fn cv(&self) -> f64 {
        if self.avg > 0.0 {
            self.std_dev / self.avg
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineEstimate {
    pub window_start:  Day,
    pub window_end:    Day,
    pub expected_days: usize,
    pub data_days:     usize,
    /// Days dropped by the contamination policy.
    pub excluded_days: usize,
    pub signups:       MetricStats,
    pub activations:   MetricStats,
}

impl BaselineEstimate {
    pub fn stats(&self, metric: MetricKind) -> &MetricStats {
        match metric {
            MetricKind::Signups     => &self.signups,
            MetricKind::Activations => &self.activations,
        }
    }

    pub fn avg(&self, metric: MetricKind) -> f64 {
        self.stats(metric).avg
    }

    /// Fraction of the window with a usable metric row.
    pub fn coverage(&self) -> f64 {
        if self.expected_days == 0 {
            0.0
        } else {
            self.data_days as f64 / self.expected_days as f64
        }
    }
}

/// `(start, end)` of the baseline window for an activity on `date`.
/// None when the window is empty or falls outside the calendar range.
pub fn baseline_window(date: Day, window_days: u32) -> Option<(Day, Day)> {
    if window_days == 0 {
        return None;
    }
    let end = date.checked_sub_days(Days::new(1))?;
    let start = end.checked_sub_days(Days::new(u64::from(window_days) - 1))?;
    Some((start, end))
}

/// Estimate both metrics over the baseline window.
///
/// `series` must hold a single channel's rows sorted by date ascending.
/// Dates in `excluded` are skipped. None when the window cannot be formed.
pub fn estimate_baseline(
    series:      &[DailyMetric],
    date:        Day,
    window_days: u32,
    excluded:    &BTreeSet<Day>,
) -> Option<BaselineEstimate> {
    let (window_start, window_end) = baseline_window(date, window_days)?;

    let first = series.partition_point(|m| m.date < window_start);
    let mut signups = Vec::new();
    let mut activations = Vec::new();
    let mut excluded_days = 0;

    for row in series[first..].iter().take_while(|m| m.date <= window_end) {
        if excluded.contains(&row.date) {
            excluded_days += 1;
            continue;
        }
        signups.push(MetricKind::Signups.value_of(row));
        activations.push(MetricKind::Activations.value_of(row));
    }

    Some(BaselineEstimate {
        window_start,
        window_end,
        expected_days: window_days as usize,
        data_days: signups.len(),
        excluded_days,
        signups: MetricStats::from_values(&signups),
        activations: MetricStats::from_values(&activations),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> Day {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn row(day: u32, signups: i64, activations: i64) -> DailyMetric {
        DailyMetric { date: d(day), channel: "newsletter".into(), signups, activations }
    }

    #[test]
    fn window_bounds_for_seven_days() {
        let (start, end) = baseline_window(d(15), 7).unwrap();
        assert_eq!(end, d(14));
        assert_eq!(start, d(8));
    }

    #[test]
    fn window_before_the_calendar_start_is_none() {
        assert_eq!(baseline_window(NaiveDate::MIN, 7), None);
        assert_eq!(baseline_window(d(15), 0), None);
        assert!(estimate_baseline(&[], NaiveDate::MIN, 7, &BTreeSet::new()).is_none());
    }

    #[test]
    fn missing_days_are_not_zero_filled() {
        let series = vec![row(8, 10, 4), row(10, 20, 6), row(14, 30, 8), row(15, 500, 500)];
        let est = estimate_baseline(&series, d(15), 7, &BTreeSet::new()).unwrap();
        assert_eq!(est.data_days, 3);
        assert_eq!(est.expected_days, 7);
        assert_eq!(est.signups.avg, 20.0);
        assert_eq!(est.activations.avg, 6.0);
    }

    #[test]
    fn empty_window_yields_zero_baseline() {
        let series = vec![row(20, 10, 4)];
        let est = estimate_baseline(&series, d(15), 7, &BTreeSet::new()).unwrap();
        assert_eq!(est.data_days, 0);
        assert_eq!(est.signups, MetricStats::default());
        assert_eq!(est.coverage(), 0.0);
    }

    #[test]
    fn excluded_days_are_skipped_and_counted() {
        let series = vec![row(12, 10, 1), row(13, 100, 1), row(14, 10, 1)];
        let excluded: BTreeSet<Day> = [d(13)].into_iter().collect();
        let est = estimate_baseline(&series, d(15), 7, &excluded).unwrap();
        assert_eq!(est.data_days, 2);
        assert_eq!(est.excluded_days, 1);
        assert_eq!(est.signups.avg, 10.0);
    }

    #[test]
    fn cv_of_flat_series_is_zero() {
        let stats = MetricStats::from_values(&[5.0, 5.0, 5.0]);
        assert_eq!(stats.cv(), 0.0);
        assert_eq!(MetricStats::from_values(&[0.0, 0.0]).cv(), 0.0);
    }
}
