// Application layer - use cases and capability seams
pub mod forecaster;
pub mod pipeline;
pub mod risk_estimator;
pub mod scheduler;
pub mod series_source;
pub mod synthetic_forecaster;
