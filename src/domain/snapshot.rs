use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Money;

/// Revenue for one (country, product) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRevenue {
    pub country: String,
    pub product_name: String,
    pub total_revenue: Money,
    pub transaction_count: u64,
}

/// Units sold for one product, with the highest stock level observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFrequency {
    pub product_id: String,
    pub product_name: String,
    pub purchase_count: u64,
    #[serde(rename = "current_stock")]
    pub stock_quantity: u32,
}

/// Sales volume for one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySales {
    pub month: String,
    pub sales_volume: Money,
    pub item_count: u64,
}

/// Revenue and items sold for one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRevenue {
    pub region: String,
    pub total_revenue: Money,
    pub items_sold: u64,
}

/// Immutable bundle of the four aggregate views from one pipeline run
///
/// A refresh builds a new snapshot and swaps the shared `Arc`; published
/// snapshots are never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub country_revenue: Vec<CountryRevenue>,
    pub top_products: Vec<ProductFrequency>,
    pub monthly_sales: Vec<MonthlySales>,
    pub top_regions: Vec<RegionRevenue>,
    pub processing_time_ms: u64,
    pub total_records: usize,
    pub cache_hit: bool,
    pub generated_at: DateTime<Utc>,
}

impl AggregateSnapshot {
    /// Snapshot with no data, as produced from an input without records
    pub fn empty() -> Self {
        Self {
            country_revenue: Vec::new(),
            top_products: Vec::new(),
            monthly_sales: Vec::new(),
            top_regions: Vec::new(),
            processing_time_ms: 0,
            total_records: 0,
            cache_hit: false,
            generated_at: Utc::now(),
        }
    }

    /// Copy of this snapshot flagged as served from cache
    ///
    /// Returns the same allocation when the flag is already set.
    pub fn as_cached(self: &Arc<Self>) -> Arc<Self> {
        if self.cache_hit {
            return Arc::clone(self);
        }
        let mut cached = (**self).clone();
        cached.cache_hit = true;
        Arc::new(cached)
    }

    /// Sum of monthly sales volume
    pub fn total_revenue(&self) -> Money {
        self.monthly_sales.iter().map(|m| m.sales_volume).sum()
    }

    /// Check whether all four views are empty
    pub fn is_empty(&self) -> bool {
        self.country_revenue.is_empty()
            && self.top_products.is_empty()
            && self.monthly_sales.is_empty()
            && self.top_regions.is_empty()
    }
}
