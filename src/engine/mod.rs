pub mod aggregator;
pub mod error;

// Re-export commonly used types
pub use aggregator::{
    Aggregator, GroupAccumulator, TOP_PRODUCTS_LIMIT, TOP_REGIONS_LIMIT, accumulate,
    country_revenue, monthly_sales, top_products, top_regions,
};
pub use error::EngineError;
