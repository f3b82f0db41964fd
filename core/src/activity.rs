//! Input records: activities and daily ground-truth metrics.
//!
//! Both are read-only to the engine. Activity metadata arrives as loosely
//! typed JSON and is parsed exactly once, here, at the ingestion boundary.

use crate::types::{ActivityId, Channel, Day};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Numeric side-channel attached to an activity (impressions, opens, ...).
pub type ActivityMetadata = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    NewsletterSend,
    LinkedinPost,
    YoutubeVideo,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Planned,
    Scheduled,
    Published,
    Completed,
    Cancelled,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::NewsletterSend => "newsletter_send",
            ActivityType::LinkedinPost   => "linkedin_post",
            ActivityType::YoutubeVideo   => "youtube_video",
            ActivityType::Other          => "other",
        }
    }

    /// Unknown labels map to `Other`.
    pub fn parse(s: &str) -> Self {
        match s {
            "newsletter_send" => ActivityType::NewsletterSend,
            "linkedin_post"   => ActivityType::LinkedinPost,
            "youtube_video"   => ActivityType::YoutubeVideo,
            _                 => ActivityType::Other,
        }
    }
}

impl ActivityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityStatus::Planned   => "planned",
            ActivityStatus::Scheduled => "scheduled",
            ActivityStatus::Published => "published",
            ActivityStatus::Completed => "completed",
            ActivityStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planned"   => Some(ActivityStatus::Planned),
            "scheduled" => Some(ActivityStatus::Scheduled),
            "published" => Some(ActivityStatus::Published),
            "completed" => Some(ActivityStatus::Completed),
            "cancelled" => Some(ActivityStatus::Cancelled),
            _           => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id:            ActivityId,
    pub activity_type: ActivityType,
    pub channel:       Channel,
    pub partner_name:  String,
    pub date:          Day,
    pub status:        ActivityStatus,
    #[serde(default)]
    pub cost_usd:      Option<f64>,
    #[serde(default)]
    pub deterministic_clicks: Option<f64>,
    #[serde(default)]
    pub actual_clicks: Option<f64>,
    #[serde(default)]
    pub deterministic_tracked_signups: Option<f64>,
    #[serde(default)]
    pub metadata:      Option<ActivityMetadata>,
    #[serde(default)]
    pub content_url:   Option<String>,
    #[serde(default)]
    pub channel_url:   Option<String>,
    #[serde(default)]
    pub notes:         Option<String>,
}

impl Activity {
    /// Cancelled activities never receive an uplift row.
    pub fn is_eligible(&self) -> bool {
        self.status != ActivityStatus::Cancelled
    }

    /// Numeric metadata value, if present and finite.
    pub fn metadata_value(&self, key: &str) -> Option<f64> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .copied()
            .filter(|v| v.is_finite())
    }
}

/// One ground-truth row per (date, channel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMetric {
    pub date:        Day,
    pub channel:     Channel,
    pub signups:     i64,
    pub activations: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Signups,
    Activations,
}

impl MetricKind {
    pub fn value_of(self, row: &DailyMetric) -> f64 {
        match self {
            MetricKind::Signups     => row.signups as f64,
            MetricKind::Activations => row.activations as f64,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Signups     => "signups",
            MetricKind::Activations => "activations",
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum MetadataError {
    #[error("metadata is not valid JSON: {0}")]
    NotJson(String),

    #[error("metadata must be a JSON object")]
    NotAnObject,

    #[error("metadata key '{key}' is not a finite number")]
    NonNumeric { key: String },
}

/// Parse raw metadata JSON into a string→number map.
///
/// `null` and the empty string mean "no metadata". Any non-numeric value
/// rejects the whole document; a partially populated map is never returned.
pub fn parse_metadata(raw: &str) -> Result<Option<ActivityMetadata>, MetadataError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| MetadataError::NotJson(e.to_string()))?;
    let object = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Object(object) => object,
        _ => return Err(MetadataError::NotAnObject),
    };

    let mut out = ActivityMetadata::new();
    for (key, v) in object {
        let n = v
            .as_f64()
            .filter(|n| n.is_finite())
            .ok_or_else(|| MetadataError::NonNumeric { key: key.clone() })?;
        out.insert(key, n);
    }
    Ok(Some(out))
}

/// Lenient variant used at the store boundary: a malformed document is
/// logged and treated as absent so it cannot abort the batch.
pub fn parse_metadata_lenient(activity_id: &str, raw: Option<&str>) -> Option<ActivityMetadata> {
    let raw = raw?;
    match parse_metadata(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("activity {activity_id}: ignoring malformed metadata ({e})");
            None
        }
    }
}
