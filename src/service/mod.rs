pub mod analytics;
pub mod error;
pub mod producer;

// Re-export commonly used types
pub use analytics::AnalyticsService;
pub use error::ServiceError;
pub use producer::{CsvSnapshotProducer, Produced, SnapshotProducer};
