// Synthetic fallback forecaster - deterministic local substitute
//
// Used whenever the external service is unreachable, unauthenticated, times
// out, or returns garbage. Model, fully deterministic (no RNG):
//   - point estimates continue a local linear trend fitted by least squares
//     over the trailing `trend_window` points (flat hold below two points);
//   - interval half-width is z * sigma * sqrt(step + 1), where sigma is the
//     trailing sample standard deviation over `volatility_window` points,
//     floored to keep the band visible on flat data. The sqrt growth mimics
//     random-walk uncertainty accumulation over the horizon.
use crate::application::forecaster::Forecaster;
use crate::application::risk_estimator::normal_quantile;
use crate::domain::forecast::{Forecast, ForecastOrigin, ForecastPoint};
use crate::domain::series::Series;
use crate::error::ForecastServiceError;
use async_trait::async_trait;

const DEFAULT_TREND_WINDOW: usize = 30;
const DEFAULT_VOLATILITY_WINDOW: usize = 240;
const SIGMA_FLOOR_VOLTS: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct SyntheticForecaster {
    trend_window: usize,
    volatility_window: usize,
}

impl Default for SyntheticForecaster {
    fn default() -> Self {
        Self {
            trend_window: DEFAULT_TREND_WINDOW,
            volatility_window: DEFAULT_VOLATILITY_WINDOW,
        }
    }
}

impl SyntheticForecaster {
    pub fn new(trend_window: usize, volatility_window: usize) -> Self {
        Self {
            trend_window,
            volatility_window,
        }
    }

    /// Pure computation behind the trait impl. Confidence level is validated
    /// at configuration time, before any forecast runs.
    pub fn compute(&self, series: &Series, horizon_steps: usize, confidence_level: f64) -> Forecast {
        debug_assert!(confidence_level > 0.0 && confidence_level < 1.0);

        let Some(last) = series.last() else {
            return Forecast::new(Vec::new(), ForecastOrigin::Synthetic, confidence_level);
        };

        let cadence = series.sampling_interval();
        let slope = series.linear_trend(self.trend_window);
        let sigma = series
            .trailing_std(self.volatility_window)
            .max(SIGMA_FLOOR_VOLTS);
        let z = normal_quantile((1.0 + confidence_level) / 2.0);

        let points = (0..horizon_steps)
            .map(|k| {
                let step = (k + 1) as f64;
                let timestamp = last.timestamp + cadence * (k as i32 + 1);
                let point = last.voltage + slope * step;
                let half_width = z * sigma * step.sqrt();
                ForecastPoint::new(
                    timestamp,
                    point,
                    point - half_width,
                    point + half_width,
                    confidence_level,
                )
            })
            .collect();

        Forecast::new(points, ForecastOrigin::Synthetic, confidence_level)
    }
}

#[async_trait]
impl Forecaster for SyntheticForecaster {
    async fn forecast(
        &self,
        series: &Series,
        horizon_steps: usize,
        confidence_level: f64,
    ) -> Result<Forecast, ForecastServiceError> {
        Ok(self.compute(series, horizon_steps, confidence_level))
    }

    fn origin(&self) -> ForecastOrigin {
        ForecastOrigin::Synthetic
    }
}
