// Pipeline result snapshot - immutable output of one refresh cycle
use super::forecast::{Forecast, ForecastOrigin};
use super::risk::RiskPoint;
use super::series::Series;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Scalar summary block for display alongside the full curves.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub current_voltage: f64,
    pub nearest_failure_probability: f64,
    pub peak_failure_probability: f64,
    pub forecast_origin: ForecastOrigin,
    pub low_confidence: bool,
}

/// Everything one pipeline run produces. Built once per run, never mutated;
/// the next run replaces it wholesale.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub series: Series,
    pub forecast: Forecast,
    pub risk: Vec<RiskPoint>,
    pub summary: Summary,
    pub generated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(series: Series, forecast: Forecast, risk: Vec<RiskPoint>) -> Self {
        let current_voltage = series.last().map(|r| r.voltage).unwrap_or(f64::NAN);
        let nearest_failure_probability = risk
            .first()
            .map(|r| r.failure_probability)
            .unwrap_or(0.0);
        let peak_failure_probability = risk
            .iter()
            .map(|r| r.failure_probability)
            .fold(0.0, f64::max);

        let summary = Summary {
            current_voltage,
            nearest_failure_probability,
            peak_failure_probability,
            forecast_origin: forecast.origin,
            low_confidence: series.is_low_confidence(),
        };

        Self {
            series,
            forecast,
            risk,
            summary,
            generated_at: Utc::now(),
        }
    }
}

/// What the scheduler hands to the presentation layer: the latest completed
/// snapshot plus staleness state when the most recent cycle aborted.
#[derive(Debug, Clone)]
pub struct SnapshotView {
    pub snapshot: Arc<Snapshot>,
    pub stale: bool,
    pub advisory: Option<String>,
}
