// Monitor configuration - file + environment, validated before first cycle
use crate::application::pipeline::PipelineSettings;
use crate::domain::risk::TailSide;
use crate::error::PipelineError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Ordered candidate locations for the voltage CSV; first readable wins.
    #[serde(default = "default_candidates")]
    pub data_source_candidates: Vec<String>,
    #[serde(default = "default_horizon_steps")]
    pub horizon_steps: usize,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// Volts. With `tail_side = "lower"` this is the low-voltage failure line.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f64,
    #[serde(default)]
    pub tail_side: TailSide,
    /// 0 disables the timer (manual-only refresh).
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    #[serde(default = "default_max_series_length")]
    pub max_series_length: usize,
    /// Context points kept before the trailing non-zero streak.
    #[serde(default = "default_context_pad")]
    pub context_pad: usize,
    #[serde(default = "default_forecast_api_url")]
    pub forecast_api_url: String,
    #[serde(default = "default_forecast_timeout")]
    pub forecast_timeout_seconds: u64,
    /// Optional; absence routes every cycle to the synthetic fallback.
    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_candidates() -> Vec<String> {
    vec![
        "data/stack_voltage.csv".to_string(),
        "Detailed_dataset/stack_voltage.csv".to_string(),
    ]
}

fn default_horizon_steps() -> usize {
    120
}

fn default_confidence_level() -> f64 {
    0.95
}

fn default_failure_threshold() -> f64 {
    0.60
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_max_series_length() -> usize {
    4000
}

fn default_context_pad() -> usize {
    180
}

fn default_forecast_api_url() -> String {
    "https://api.nixtla.io/v1/forecast".to_string()
}

fn default_forecast_timeout() -> u64 {
    10
}

impl MonitorConfig {
    /// Reject bad thresholds and confidence levels before any cycle runs;
    /// these must never surface mid-refresh.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if !(self.failure_threshold > 0.0 && self.failure_threshold < 10.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "failure_threshold must be a plausible voltage in (0, 10), got {}",
                self.failure_threshold
            )));
        }
        if self.horizon_steps == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "horizon_steps must be at least 1".to_string(),
            ));
        }
        if self.max_series_length == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "max_series_length must be at least 1".to_string(),
            ));
        }
        if self.forecast_timeout_seconds == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "forecast_timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            horizon_steps: self.horizon_steps,
            confidence_level: self.confidence_level,
            failure_threshold: self.failure_threshold,
            tail_side: self.tail_side,
            forecast_timeout: Duration::from_secs(self.forecast_timeout_seconds),
        }
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        if self.refresh_interval_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.refresh_interval_seconds))
        }
    }
}

pub fn load_monitor_config() -> anyhow::Result<MonitorConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/monitor").required(false))
        .add_source(config::Environment::with_prefix("MONITOR").try_parsing(true))
        .build()?;

    Ok(settings.try_deserialize()?)
}
