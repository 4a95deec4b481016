// Error taxonomy for the forecast-to-risk pipeline
use thiserror::Error;

/// Errors that abort a refresh cycle. Everything else degrades inside the
/// cycle (see `ForecastServiceError`) or is a flag on the data itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no readable voltage data source found among configured candidates")]
    DataUnavailable,

    #[error("data source is unparseable: {0}")]
    InvalidSchema(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Failures of the external forecasting service. These never abort a cycle:
/// the pipeline recovers by switching to the synthetic fallback forecaster.
#[derive(Debug, Error)]
pub enum ForecastServiceError {
    #[error("no API credential configured")]
    MissingCredentials,

    #[error("request to forecasting service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("forecasting service returned status {0}: {1}")]
    Status(u16, String),

    #[error("malformed forecast response: {0}")]
    MalformedResponse(String),

    #[error("forecast request timed out after {0}s")]
    Timeout(u64),
}
