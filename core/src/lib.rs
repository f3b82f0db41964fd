//! Uplift attribution engine.
//!
//! Estimates each marketing activity's incremental signups and activations
//! against an organic baseline, grades the estimate, and splits credit
//! between activities whose effect windows overlap on the same channel.

pub mod activity;
pub mod attribution;
pub mod baseline;
pub mod confidence;
pub mod config;
pub mod engine;
pub mod error;
pub mod lift;
pub mod report;
pub mod store;
pub mod synthetic;
pub mod types;

pub use attribution::apply_proportional_attribution;
pub use report::compute_all_reports;
