pub mod collector;
pub mod error;
pub mod pipeline;
pub mod policy;
pub mod reader;
pub mod worker;

// Re-export commonly used types
pub use collector::{ChunkSlots, Collected, Collector, ProcessingStats};
pub use error::PipelineError;
pub use pipeline::IngestPipeline;
pub use policy::{FailOnLoss, LogAndContinue, LossPolicy};
pub use reader::{BatchReader, Chunk, ReadSummary};
pub use worker::{ChunkResult, PoolSummary, WorkerPool, process_chunk};
