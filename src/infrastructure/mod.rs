// Infrastructure layer - external dependencies and adapters
pub mod config;
pub mod csv_source;
pub mod forecast_api;
