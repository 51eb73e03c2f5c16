//! Prelude module for convenient imports
//!
//! Import everything you need with: `use analytics::prelude::*;`

// Domain types
pub use crate::domain::{
    AggregateSnapshot, CountryRevenue, DomainError, Money, MonthlySales, ProductFrequency, Record,
    RegionRevenue,
};

// IO types
pub use crate::io::{IoError, RawRow, parse_row};

// Streaming types
pub use crate::streaming::{
    Collected, FailOnLoss, IngestPipeline, LogAndContinue, LossPolicy, PipelineError,
    ProcessingStats,
};

// Engine types
pub use crate::engine::{Aggregator, EngineError};

// Storage types
pub use crate::storage::{
    CacheBackend, FileCache, FixedMemory, MemoryCache, MemoryProbe, ProcessMemory, StorageError,
    TieredCache,
};

// Service types
pub use crate::service::{AnalyticsService, CsvSnapshotProducer, ServiceError, SnapshotProducer};

// Config and app types
pub use crate::app::{AppError, CliApp, Command, USAGE, execute, init_logging};
pub use crate::config::{Config, ConfigError};
