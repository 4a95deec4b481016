// Forecast domain model - points with confidence intervals
use chrono::{DateTime, Utc};

/// Where a forecast came from. The presentation layer renders synthetic
/// forecasts differently so operators know the external service was down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastOrigin {
    Live,
    Synthetic,
}

/// One forecast step: point estimate with a confidence interval.
#[derive(Debug, Clone, Copy)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
    /// Set when the service returned an interval that did not contain the
    /// point estimate and the bounds had to be clamped.
    pub degraded: bool,
}

impl ForecastPoint {
    pub fn new(
        timestamp: DateTime<Utc>,
        point: f64,
        lower: f64,
        upper: f64,
        confidence_level: f64,
    ) -> Self {
        Self {
            timestamp,
            point,
            lower,
            upper,
            confidence_level,
            degraded: false,
        }
    }

    /// Enforce `lower <= point <= upper` by clamping the offending bound.
    /// A violated interval marks the point degraded instead of dropping it:
    /// one bad point must not fail the whole forecast.
    pub fn clamped(
        timestamp: DateTime<Utc>,
        point: f64,
        lower: f64,
        upper: f64,
        confidence_level: f64,
    ) -> Self {
        let degraded = lower > point || upper < point;
        Self {
            timestamp,
            point,
            lower: lower.min(point),
            upper: upper.max(point),
            confidence_level,
            degraded,
        }
    }

    pub fn interval_width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Ordered forecast over a fixed horizon from the last historical timestamp.
#[derive(Debug, Clone)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    pub origin: ForecastOrigin,
    pub confidence_level: f64,
}

impl Forecast {
    pub fn new(points: Vec<ForecastPoint>, origin: ForecastOrigin, confidence_level: f64) -> Self {
        Self {
            points,
            origin,
            confidence_level,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == ForecastOrigin::Synthetic
    }

    pub fn degraded_count(&self) -> usize {
        self.points.iter().filter(|p| p.degraded).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_clamped_keeps_valid_interval() {
        let p = ForecastPoint::clamped(ts(), 0.55, 0.53, 0.57, 0.95);
        assert!(!p.degraded);
        assert_eq!(p.lower, 0.53);
        assert_eq!(p.upper, 0.57);
    }

    #[test]
    fn test_clamped_fixes_inverted_lower_bound() {
        let p = ForecastPoint::clamped(ts(), 0.55, 0.60, 0.70, 0.95);
        assert!(p.degraded);
        assert_eq!(p.lower, 0.55);
        assert_eq!(p.upper, 0.70);
    }

    #[test]
    fn test_clamped_fixes_inverted_upper_bound() {
        let p = ForecastPoint::clamped(ts(), 0.55, 0.40, 0.50, 0.95);
        assert!(p.degraded);
        assert_eq!(p.lower, 0.40);
        assert_eq!(p.upper, 0.55);
    }

    #[test]
    fn test_degraded_count() {
        let points = vec![
            ForecastPoint::clamped(ts(), 0.55, 0.53, 0.57, 0.95),
            ForecastPoint::clamped(ts(), 0.55, 0.60, 0.70, 0.95),
        ];
        let forecast = Forecast::new(points, ForecastOrigin::Live, 0.95);
        assert_eq!(forecast.degraded_count(), 1);
    }
}
