//! Confidence scorer: grades a raw lift estimate.
//!
//! Rules, first match wins:
//!   1. fewer than `min_baseline_days` with data    → LOW
//!   2. coverage / CV within HIGH thresholds        → HIGH
//!      coverage / CV within MEDIUM thresholds      → MEDIUM
//!      otherwise                                   → LOW
//!   3. post-window overlap on the same channel caps HIGH at MEDIUM
//!
//! A window that cannot be placed on the calendar is graded LOW by
//! `window_out_of_range` without looking at any data.
//!
//! Pure and deterministic: explanations use fixed precision so identical
//! inputs always render identical text.

use crate::{
    activity::MetricKind,
    baseline::BaselineEstimate,
    config::ConfidencePolicy,
    error::UpliftError,
    types::Day,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low    => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High   => "HIGH",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Confidence {
    type Err = UpliftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW"    => Ok(Confidence::Low),
            "MEDIUM" => Ok(Confidence::Medium),
            "HIGH"   => Ok(Confidence::High),
            other    => Err(anyhow::anyhow!("unknown confidence grade '{other}'").into()),
        }
    }
}

/// The criterion that decided the grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    InsufficientBaseline,
    Coverage,
    Variance,
    Overlap,
    Stable,
    /// Baseline or post window falls outside the calendar range.
    WindowOutOfRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceGrade {
    pub confidence:  Confidence,
    pub criterion:   Criterion,
    pub explanation: String,
}

pub fn score_confidence(
    baseline:    &BaselineEstimate,
    metric:      MetricKind,
    overlapping: usize,
    policy:      &ConfidencePolicy,
) -> ConfidenceGrade {
    let data = baseline.data_days;
    let expected = baseline.expected_days;
    let coverage = baseline.coverage();
    let cv = baseline.stats(metric).cv();
    let days = format!("{data}/{expected} baseline days with data");

    if data < policy.min_baseline_days {
        return ConfidenceGrade {
            confidence:  Confidence::Low,
            criterion:   Criterion::InsufficientBaseline,
            explanation: with_overlap(
                format!(
                    "LOW: insufficient baseline data ({days}, minimum {})",
                    policy.min_baseline_days
                ),
                overlapping,
            ),
        };
    }

    let (confidence, criterion, explanation) = if coverage < policy.medium_min_coverage {
        (
            Confidence::Low,
            Criterion::Coverage,
            format!(
                "LOW: baseline coverage {} below {} ({days})",
                pct(coverage),
                pct(policy.medium_min_coverage)
            ),
        )
    } else if cv > policy.medium_max_cv {
        (
            Confidence::Low,
            Criterion::Variance,
            format!(
                "LOW: {} baseline too volatile (CV {cv:.2} above {:.2})",
                metric.as_str(),
                policy.medium_max_cv
            ),
        )
    } else if coverage < policy.high_min_coverage {
        (
            Confidence::Medium,
            Criterion::Coverage,
            format!(
                "MEDIUM: baseline coverage {} below {} required for HIGH ({days})",
                pct(coverage),
                pct(policy.high_min_coverage)
            ),
        )
    } else if cv > policy.high_max_cv {
        (
            Confidence::Medium,
            Criterion::Variance,
            format!(
                "MEDIUM: {} baseline CV {cv:.2} above {:.2} required for HIGH",
                metric.as_str(),
                policy.high_max_cv
            ),
        )
    } else if overlapping > 0 {
        return ConfidenceGrade {
            confidence:  Confidence::Medium,
            criterion:   Criterion::Overlap,
            explanation: format!(
                "MEDIUM: post-window overlaps {} on this channel; credit is estimated, not directly observed ({days}, CV {cv:.2})",
                plural_activities(overlapping)
            ),
        };
    } else {
        (
            Confidence::High,
            Criterion::Stable,
            format!("HIGH: {days}, {} CV {cv:.2}, no overlapping activity", metric.as_str()),
        )
    };

    ConfidenceGrade {
        confidence,
        criterion,
        explanation: with_overlap(explanation, overlapping),
    }
}

/// Grade for an activity whose windows cannot be formed around `date`.
pub fn window_out_of_range(date: Day, overlapping: usize) -> ConfidenceGrade {
    ConfidenceGrade {
        confidence:  Confidence::Low,
        criterion:   Criterion::WindowOutOfRange,
        explanation: with_overlap(
            format!("LOW: baseline or post window for {date} falls outside the supported calendar range; no lift computed"),
            overlapping,
        ),
    }
}

fn with_overlap(explanation: String, overlapping: usize) -> String {
    if overlapping == 0 {
        explanation
    } else {
        format!(
            "{explanation}; post-window also overlaps {}",
            plural_activities(overlapping)
        )
    }
}

fn plural_activities(n: usize) -> String {
    if n == 1 {
        "1 other activity".into()
    } else {
        format!("{n} other activities")
    }
}

fn pct(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}
