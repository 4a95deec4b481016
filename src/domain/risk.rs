// Failure-risk domain model
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Which tail of the forecast distribution counts as failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailSide {
    /// Failure means voltage dropping below the threshold. Default: cell
    /// degradation pulls stack voltage down.
    Lower,
    /// Failure means voltage exceeding the threshold.
    Upper,
    /// Failure means leaving the symmetric band around the point estimate
    /// whose half-width is the distance to the threshold.
    TwoSided,
}

impl Default for TailSide {
    fn default() -> Self {
        TailSide::Lower
    }
}

/// Failure probability at one forecast timestep, always in [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct RiskPoint {
    pub timestamp: DateTime<Utc>,
    pub failure_probability: f64,
}

impl RiskPoint {
    pub fn new(timestamp: DateTime<Utc>, failure_probability: f64) -> Self {
        Self {
            timestamp,
            failure_probability: failure_probability.clamp(0.0, 1.0),
        }
    }
}
