// Main entry point - dependency injection and scheduler launch
mod application;
mod domain;
mod error;
mod infrastructure;

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::forecaster::Forecaster;
use crate::application::pipeline::PipelineService;
use crate::application::scheduler::RefreshScheduler;
use crate::application::synthetic_forecaster::SyntheticForecaster;
use crate::infrastructure::config::load_monitor_config;
use crate::infrastructure::csv_source::CsvSeriesSource;
use crate::infrastructure::forecast_api::ApiForecaster;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Load and validate configuration; bad thresholds or confidence levels
    // must fail here, never inside a refresh cycle
    let config = load_monitor_config()?;
    config.validate()?;

    // Series source (infrastructure layer)
    let source = Arc::new(CsvSeriesSource::new(
        config
            .data_source_candidates
            .iter()
            .map(PathBuf::from)
            .collect(),
        config.max_series_length,
        config.context_pad,
    ));

    // Forecaster selection: live service when a credential is configured,
    // synthetic fallback otherwise. A missing token is a handled condition,
    // not a startup failure.
    let forecaster: Arc<dyn Forecaster> = if config.auth_token.is_some() {
        Arc::new(ApiForecaster::new(
            config.forecast_api_url.clone(),
            config.auth_token.clone(),
        ))
    } else {
        tracing::warn!("no auth token configured, running on the synthetic forecaster");
        Arc::new(SyntheticForecaster::default())
    };

    // Pipeline and scheduler (application layer)
    let pipeline = Arc::new(PipelineService::new(
        source,
        forecaster,
        config.pipeline_settings(),
    ));
    let scheduler = Arc::new(RefreshScheduler::new(pipeline, config.refresh_interval()));

    tracing::info!(
        refresh_interval_s = config.refresh_interval_seconds,
        horizon_steps = config.horizon_steps,
        failure_threshold = config.failure_threshold,
        "starting electrolyzer risk monitor"
    );

    tokio::spawn(Arc::clone(&scheduler).run());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    Ok(())
}
