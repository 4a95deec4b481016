// Domain layer - core data models and invariants
pub mod forecast;
pub mod risk;
pub mod series;
pub mod snapshot;
