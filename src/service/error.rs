use thiserror::Error;

use crate::engine::EngineError;
use crate::streaming::PipelineError;

/// Errors surfaced by [`AnalyticsService`](super::AnalyticsService)
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Ingest failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Aggregation failed: {0}")]
    Engine(#[from] EngineError),
}

impl ServiceError {
    /// Check whether the failure came from a cancelled run
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ServiceError::Pipeline(PipelineError::Cancelled))
    }
}
