pub mod error;
pub mod money;
pub mod record;
pub mod snapshot;

// Re-export commonly used types
pub use error::DomainError;
pub use money::Money;
pub use record::{Record, positive_quantity, stock_level};
pub use snapshot::{
    AggregateSnapshot, CountryRevenue, MonthlySales, ProductFrequency, RegionRevenue,
};
