// Historical voltage series domain model
use chrono::{DateTime, Duration, Utc};

/// Below this many points the forecast is flagged low-confidence rather
/// than refused outright.
pub const MIN_RELIABLE_POINTS: usize = 60;

/// Plausible stack voltage range in volts after unit normalization.
pub const MIN_PLAUSIBLE_VOLTS: f64 = 0.0;
pub const MAX_PLAUSIBLE_VOLTS: f64 = 10.0;

/// A single normalized voltage observation, in volts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub voltage: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, voltage: f64) -> Self {
        Self { timestamp, voltage }
    }
}

/// Ordered voltage history with strictly increasing unique timestamps.
/// Construction happens in the series source, which sorts, deduplicates
/// and unit-normalizes before building one of these.
#[derive(Debug, Clone)]
pub struct Series {
    readings: Vec<Reading>,
}

impl Series {
    pub fn new(readings: Vec<Reading>) -> Self {
        debug_assert!(
            readings.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "series timestamps must be strictly increasing"
        );
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn last(&self) -> Option<&Reading> {
        self.readings.last()
    }

    /// Too short for the forecast to be considered reliable. The pipeline
    /// still runs; the result carries this flag through to the summary.
    pub fn is_low_confidence(&self) -> bool {
        self.readings.len() < MIN_RELIABLE_POINTS
    }

    /// Inferred sampling cadence: median of consecutive timestamp deltas.
    /// Falls back to one minute when the series is too short to infer.
    pub fn sampling_interval(&self) -> Duration {
        let mut deltas: Vec<i64> = self
            .readings
            .windows(2)
            .map(|w| (w[1].timestamp - w[0].timestamp).num_milliseconds())
            .filter(|d| *d > 0)
            .collect();

        if deltas.is_empty() {
            return Duration::seconds(60);
        }

        deltas.sort_unstable();
        Duration::milliseconds(deltas[deltas.len() / 2])
    }

    /// Sample standard deviation over the trailing `window` points.
    pub fn trailing_std(&self, window: usize) -> f64 {
        let tail = self.tail_values(window);
        if tail.len() < 2 {
            return 0.0;
        }

        let mean = tail.iter().sum::<f64>() / tail.len() as f64;
        let var = tail.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (tail.len() - 1) as f64;
        var.sqrt()
    }

    /// Least-squares slope per step over the trailing `window` points.
    /// Returns 0.0 when there are fewer than two points to fit.
    pub fn linear_trend(&self, window: usize) -> f64 {
        let tail = self.tail_values(window);
        let n = tail.len();
        if n < 2 {
            return 0.0;
        }

        let x_mean = (n - 1) as f64 / 2.0;
        let y_mean = tail.iter().sum::<f64>() / n as f64;

        let mut num = 0.0;
        let mut den = 0.0;
        for (i, y) in tail.iter().enumerate() {
            let dx = i as f64 - x_mean;
            num += dx * (y - y_mean);
            den += dx * dx;
        }

        if den == 0.0 { 0.0 } else { num / den }
    }

    /// Copy of the series with readings outside `q1 - m*iqr ..= q3 + m*iqr`
    /// removed. Mild clipping of transient spikes stabilizes short-horizon
    /// forecasts; series too small for meaningful quartiles pass through.
    pub fn without_outliers(&self, iqr_multiplier: f64) -> Series {
        if self.readings.len() < 4 {
            return self.clone();
        }

        let mut sorted: Vec<f64> = self.readings.iter().map(|r| r.voltage).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let q1 = sorted[sorted.len() / 4];
        let q3 = sorted[(3 * sorted.len()) / 4];
        let iqr = q3 - q1;
        if iqr <= 0.0 {
            return self.clone();
        }

        let (lo, hi) = (q1 - iqr_multiplier * iqr, q3 + iqr_multiplier * iqr);
        Series::new(
            self.readings
                .iter()
                .filter(|r| r.voltage >= lo && r.voltage <= hi)
                .copied()
                .collect(),
        )
    }

    fn tail_values(&self, window: usize) -> Vec<f64> {
        let start = self.readings.len().saturating_sub(window);
        self.readings[start..].iter().map(|r| r.voltage).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn minutely(values: &[f64]) -> Series {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Series::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Reading::new(t0 + Duration::minutes(i as i64), *v))
                .collect(),
        )
    }

    #[test]
    fn test_sampling_interval_is_median_delta() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        // One 5-minute gap among 1-minute steps must not skew the cadence
        let offsets = [0i64, 1, 2, 3, 8, 9, 10];
        let series = Series::new(
            offsets
                .iter()
                .map(|m| Reading::new(t0 + Duration::minutes(*m), 0.55))
                .collect(),
        );
        assert_eq!(series.sampling_interval(), Duration::minutes(1));
    }

    #[test]
    fn test_sampling_interval_default_for_short_series() {
        let series = minutely(&[0.55]);
        assert_eq!(series.sampling_interval(), Duration::seconds(60));
    }

    #[test]
    fn test_low_confidence_flag() {
        assert!(minutely(&vec![0.55; 59]).is_low_confidence());
        assert!(!minutely(&vec![0.55; 60]).is_low_confidence());
    }

    #[test]
    fn test_linear_trend_recovers_slope() {
        let values: Vec<f64> = (0..50).map(|i| 0.60 - 0.001 * i as f64).collect();
        let series = minutely(&values);
        let slope = series.linear_trend(30);
        assert!((slope + 0.001).abs() < 1e-12, "slope was {slope}");
    }

    #[test]
    fn test_trailing_std_constant_series_is_zero() {
        let series = minutely(&vec![0.55; 20]);
        assert_eq!(series.trailing_std(10), 0.0);
    }

    #[test]
    fn test_without_outliers_drops_spike_only() {
        let mut values: Vec<f64> = (0..40).map(|i| 0.55 + 0.001 * i as f64).collect();
        values[20] = 3.0; // transient spike
        let series = minutely(&values);

        let clipped = series.without_outliers(2.0);
        assert_eq!(clipped.len(), 39);
        assert!(clipped.readings().iter().all(|r| r.voltage < 1.0));
    }

    #[test]
    fn test_without_outliers_keeps_clean_series_intact() {
        let values: Vec<f64> = (0..50).map(|i| 0.60 - 0.001 * i as f64).collect();
        let series = minutely(&values);
        assert_eq!(series.without_outliers(2.0).len(), 50);
    }

    #[test]
    fn test_without_outliers_passes_tiny_series_through() {
        let series = minutely(&[0.55, 9.0, 0.56]);
        assert_eq!(series.without_outliers(2.0).len(), 3);
    }

    #[test]
    fn test_trailing_std_window_limits_lookback() {
        // Old noisy values outside the window must not affect the result
        let mut values = vec![5.0, -5.0, 5.0, -5.0];
        values.extend(vec![0.55; 10]);
        let series = minutely(&values);
        assert_eq!(series.trailing_std(10), 0.0);
    }
}
