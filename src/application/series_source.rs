// Series source trait - seam between the pipeline and the data backend
use crate::domain::series::Series;
use crate::error::PipelineError;
use async_trait::async_trait;

/// Loads the historical voltage series for one refresh cycle.
///
/// Implementations own location, parsing, unit normalization, deduplication
/// and length capping; the pipeline receives a ready-to-forecast `Series`.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    async fn load(&self) -> Result<Series, PipelineError>;
}
