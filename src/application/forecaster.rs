// Forecaster trait - capability seam over the forecasting backend
use crate::domain::forecast::{Forecast, ForecastOrigin};
use crate::domain::series::Series;
use crate::error::ForecastServiceError;
use async_trait::async_trait;

/// Produces a forecast with confidence intervals over `horizon_steps` future
/// steps at the series' sampling cadence.
///
/// Two implementations exist: the live HTTP client and the deterministic
/// synthetic fallback. The pipeline selects between them at runtime so the
/// external service being unreachable never surfaces as a pipeline failure.
#[async_trait]
pub trait Forecaster: Send + Sync {
    async fn forecast(
        &self,
        series: &Series,
        horizon_steps: usize,
        confidence_level: f64,
    ) -> Result<Forecast, ForecastServiceError>;

    fn origin(&self) -> ForecastOrigin;
}
