use crate::{
    activity::MetricKind,
    error::{UpliftError, UpliftResult},
};
use serde::{Deserialize, Serialize};

/// Weight field that selects the actual → deterministic → default click chain.
pub const CLICKS_WEIGHT_FIELD: &str = "clicks";

/// Longest accepted baseline or post window, in days.
pub const MAX_WINDOW_DAYS: u32 = 366;

// ── Post-window attribution ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostWindowAttributionConfig {
    pub enabled: bool,
    /// "clicks", or the name of a numeric metadata key.
    pub weight_field: String,
    /// Weight used when the activity carries no usable value.
    pub default_weight: f64,
}

impl Default for PostWindowAttributionConfig {
    fn default() -> Self {
        Self {
            enabled:        true,
            weight_field:   CLICKS_WEIGHT_FIELD.into(),
            default_weight: 1.0,
        }
    }
}

// ── Confidence thresholds ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidencePolicy {
    /// Fewer baseline days with data than this forces LOW.
    pub min_baseline_days: usize,
    /// Minimum fraction of baseline days with data for HIGH.
    pub high_min_coverage: f64,
    /// Maximum baseline coefficient of variation for HIGH.
    pub high_max_cv: f64,
    pub medium_min_coverage: f64,
    pub medium_max_cv: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            min_baseline_days:   4,
            high_min_coverage:   0.8,
            high_max_cv:         0.35,
            medium_min_coverage: 0.5,
            medium_max_cv:       0.75,
        }
    }
}

// ── Baseline contamination ─────────────────────────────────────────

/// Whether baseline days already inside another activity's post-window
/// on the same channel count toward the organic average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Use every day in the window. Lifts from earlier campaigns inflate
    /// the baseline when activities are scheduled back to back.
    #[default]
    Include,
    ExcludeOtherPostWindows,
}

impl std::str::FromStr for BaselinePolicy {
    type Err = UpliftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "include" => Ok(BaselinePolicy::Include),
            "exclude_other_post_windows" => Ok(BaselinePolicy::ExcludeOtherPostWindows),
            other => Err(UpliftError::config(
                "baseline_policy",
                format!("unknown policy '{other}'"),
            )),
        }
    }
}

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionConfig {
    pub baseline_window_days: u32,
    pub post_window_days:     u32,
    #[serde(default)]
    pub post_window_attribution: PostWindowAttributionConfig,
    #[serde(default)]
    pub confidence: ConfidencePolicy,
    #[serde(default)]
    pub baseline_policy: BaselinePolicy,
    /// Metric reported as `baseline_avg` and used for the variance check.
    #[serde(default = "default_primary_metric")]
    pub primary_metric: MetricKind,
}

fn default_primary_metric() -> MetricKind {
    MetricKind::Signups
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            baseline_window_days:    14,
            post_window_days:        7,
            post_window_attribution: PostWindowAttributionConfig::default(),
            confidence:              ConfidencePolicy::default(),
            baseline_policy:         BaselinePolicy::Include,
            primary_metric:          MetricKind::Signups,
        }
    }
}

impl AttributionConfig {
    /// Load from `{data_dir}/attribution/attribution_config.json`.
    /// In tests, use AttributionConfig::default_test().
    pub fn load(data_dir: &str) -> UpliftResult<Self> {
        let path = format!("{data_dir}/attribution/attribution_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AttributionConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `UPLIFT_*` environment variables.
    pub fn from_env() -> UpliftResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from a key lookup. Unset keys leave the field alone.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> UpliftResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("UPLIFT_BASELINE_WINDOW_DAYS") {
            self.baseline_window_days = parse_env("UPLIFT_BASELINE_WINDOW_DAYS", &v)?;
        }
        if let Some(v) = lookup("UPLIFT_POST_WINDOW_DAYS") {
            self.post_window_days = parse_env("UPLIFT_POST_WINDOW_DAYS", &v)?;
        }
        if let Some(v) = lookup("UPLIFT_POST_WINDOW_ATTRIBUTION") {
            self.post_window_attribution.enabled = parse_env("UPLIFT_POST_WINDOW_ATTRIBUTION", &v)?;
        }
        if let Some(v) = lookup("UPLIFT_WEIGHT_FIELD") {
            self.post_window_attribution.weight_field = v.trim().to_string();
        }
        if let Some(v) = lookup("UPLIFT_DEFAULT_WEIGHT") {
            self.post_window_attribution.default_weight = parse_env("UPLIFT_DEFAULT_WEIGHT", &v)?;
        }
        if let Some(v) = lookup("UPLIFT_BASELINE_POLICY") {
            self.baseline_policy = v.parse()?;
        }
        Ok(())
    }

    /// Reject configs the engine cannot run with. Called before any computation.
    pub fn validate(&self) -> UpliftResult<()> {
        for (field, value) in [
            ("baseline_window_days", self.baseline_window_days),
            ("post_window_days", self.post_window_days),
        ] {
            if value == 0 {
                return Err(UpliftError::config(field, "must be at least 1"));
            }
            if value > MAX_WINDOW_DAYS {
                return Err(UpliftError::config(
                    field,
                    format!("must be at most {MAX_WINDOW_DAYS} (got {value})"),
                ));
            }
        }

        let pwa = &self.post_window_attribution;
        if pwa.weight_field.trim().is_empty() {
            return Err(UpliftError::config("post_window_attribution.weight_field", "must not be empty"));
        }
        if !pwa.default_weight.is_finite() || pwa.default_weight < 0.0 {
            return Err(UpliftError::config(
                "post_window_attribution.default_weight",
                format!("must be a finite, non-negative number (got {})", pwa.default_weight),
            ));
        }

        let c = &self.confidence;
        for (field, value) in [
            ("confidence.high_min_coverage", c.high_min_coverage),
            ("confidence.medium_min_coverage", c.medium_min_coverage),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(UpliftError::config(field, format!("must be within [0, 1] (got {value})")));
            }
        }
        for (field, value) in [
            ("confidence.high_max_cv", c.high_max_cv),
            ("confidence.medium_max_cv", c.medium_max_cv),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(UpliftError::config(field, format!("must be non-negative (got {value})")));
            }
        }
        if c.high_min_coverage < c.medium_min_coverage || c.high_max_cv > c.medium_max_cv {
            return Err(UpliftError::config("confidence", "HIGH thresholds must be stricter than MEDIUM"));
        }
        if c.min_baseline_days > self.baseline_window_days as usize {
            return Err(UpliftError::config(
                "confidence.min_baseline_days",
                format!(
                    "must not exceed baseline_window_days ({} > {})",
                    c.min_baseline_days, self.baseline_window_days
                ),
            ));
        }
        Ok(())
    }

    /// Config with hardcoded values for use in tests.
    pub fn default_test() -> Self {
        Self {
            baseline_window_days: 7,
            post_window_days:     3,
            post_window_attribution: PostWindowAttributionConfig {
                enabled:        true,
                weight_field:   CLICKS_WEIGHT_FIELD.into(),
                default_weight: 1.0,
            },
            confidence:      ConfidencePolicy::default(),
            baseline_policy: BaselinePolicy::Include,
            primary_metric:  MetricKind::Signups,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> UpliftResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| UpliftError::config(key, format!("cannot parse '{raw}'")))
}
