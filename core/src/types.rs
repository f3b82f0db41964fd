//! Shared primitive types used across the engine.

/// A stable identifier for an Activity, owned by the ingestion side.
pub type ActivityId = String;

/// A channel name, e.g. "newsletter", "linkedin", "youtube".
pub type Channel = String;

/// The canonical recompute-run identifier.
pub type RunId = String;

/// Calendar day granularity for every window computation.
pub type Day = chrono::NaiveDate;
