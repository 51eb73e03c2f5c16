use tracing::warn;

use super::collector::ProcessingStats;
use super::error::PipelineError;

/// Decides what a run with significant data loss turns into
pub trait LossPolicy: Send + Sync {
    /// Return `Ok` to keep the reconstructed records, `Err` to fail the run
    fn check(&self, stats: &ProcessingStats, threshold: f64) -> Result<(), PipelineError>;
}

/// Keep whatever was reconstructed and log the loss
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAndContinue;

impl LossPolicy for LogAndContinue {
    fn check(&self, stats: &ProcessingStats, _threshold: f64) -> Result<(), PipelineError> {
        if stats.significant_loss {
            warn!(
                parsed = stats.parsed_records,
                total = stats.total_rows,
                "Continuing with partial data"
            );
        }
        Ok(())
    }
}

/// Fail the run when loss crosses the threshold
#[derive(Debug, Clone, Copy, Default)]
pub struct FailOnLoss;

impl LossPolicy for FailOnLoss {
    fn check(&self, stats: &ProcessingStats, threshold: f64) -> Result<(), PipelineError> {
        if stats.significant_loss {
            return Err(PipelineError::DataLoss {
                parsed: stats.parsed_records,
                total: stats.total_rows,
                threshold,
            });
        }
        Ok(())
    }
}
