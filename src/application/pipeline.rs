// Pipeline service - one full SeriesStore -> Forecast -> Risk cycle
use crate::application::forecaster::Forecaster;
use crate::application::risk_estimator;
use crate::application::series_source::SeriesSource;
use crate::application::synthetic_forecaster::SyntheticForecaster;
use crate::domain::forecast::Forecast;
use crate::domain::risk::TailSide;
use crate::domain::series::Series;
use crate::domain::snapshot::Snapshot;
use crate::error::{ForecastServiceError, PipelineError};
use std::sync::Arc;
use std::time::Duration;

/// Readings further than this many IQRs outside the quartiles are dropped
/// from the live forecast request.
const OUTLIER_IQR_MULTIPLIER: f64 = 2.0;

/// Run parameters, validated once at startup (see infrastructure::config).
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub horizon_steps: usize,
    pub confidence_level: f64,
    pub failure_threshold: f64,
    pub tail_side: TailSide,
    pub forecast_timeout: Duration,
}

pub struct PipelineService {
    source: Arc<dyn SeriesSource>,
    forecaster: Arc<dyn Forecaster>,
    fallback: SyntheticForecaster,
    settings: PipelineSettings,
}

impl PipelineService {
    pub fn new(
        source: Arc<dyn SeriesSource>,
        forecaster: Arc<dyn Forecaster>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            forecaster,
            fallback: SyntheticForecaster::default(),
            settings,
        }
    }

    /// Execute one refresh cycle. Only `DataUnavailable`, `InvalidSchema`
    /// and `InvalidConfiguration` can abort it; forecast service trouble of
    /// any kind degrades to the synthetic fallback instead.
    pub async fn run(&self) -> Result<Snapshot, PipelineError> {
        let series = self.source.load().await?;

        if series.is_low_confidence() {
            tracing::warn!(
                points = series.len(),
                "series below reliability threshold, result will be flagged low-confidence"
            );
        }

        let forecast = self.forecast_with_fallback(&series).await;

        if forecast.degraded_count() > 0 {
            tracing::warn!(
                degraded = forecast.degraded_count(),
                "forecast contained invalid intervals, bounds clamped"
            );
        }

        let risk = risk_estimator::estimate(
            &forecast,
            self.settings.failure_threshold,
            self.settings.tail_side,
        )?;

        Ok(Snapshot::new(series, forecast, risk))
    }

    async fn forecast_with_fallback(&self, series: &Series) -> Forecast {
        // Mild IQR clipping of transient spikes before the live call; the
        // snapshot keeps the unclipped series, and the fallback works from
        // it too.
        let cleaned = series.without_outliers(OUTLIER_IQR_MULTIPLIER);
        let attempt = tokio::time::timeout(
            self.settings.forecast_timeout,
            self.forecaster.forecast(
                &cleaned,
                self.settings.horizon_steps,
                self.settings.confidence_level,
            ),
        )
        .await;

        match attempt {
            Ok(Ok(forecast)) => forecast,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "forecast service failed, using synthetic fallback");
                self.fallback.compute(
                    series,
                    self.settings.horizon_steps,
                    self.settings.confidence_level,
                )
            }
            Err(_) => {
                let e = ForecastServiceError::Timeout(self.settings.forecast_timeout.as_secs());
                tracing::warn!(error = %e, "using synthetic fallback");
                self.fallback.compute(
                    series,
                    self.settings.horizon_steps,
                    self.settings.confidence_level,
                )
            }
        }
    }
}
