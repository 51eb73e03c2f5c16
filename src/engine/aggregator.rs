use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use super::error::EngineError;
use crate::domain::{
    AggregateSnapshot, CountryRevenue, Money, MonthlySales, ProductFrequency, Record,
    RegionRevenue,
};

pub const TOP_PRODUCTS_LIMIT: usize = 20;
pub const TOP_REGIONS_LIMIT: usize = 30;

/// Running totals for one group key
///
/// `first` is the record that created the group; labels that are not part
/// of the key (product name for a product id) come from it.
#[derive(Debug)]
pub struct GroupAccumulator<'a> {
    pub first: &'a Record,
    pub revenue: Money,
    pub quantity: u64,
    pub count: u64,
    pub max_stock: u32,
}

impl<'a> GroupAccumulator<'a> {
    fn new(first: &'a Record) -> Self {
        Self {
            first,
            revenue: Money::ZERO,
            quantity: 0,
            count: 0,
            max_stock: first.stock_quantity,
        }
    }

    fn add(&mut self, record: &Record) {
        self.revenue += record.total_price;
        self.quantity += u64::from(record.quantity);
        self.count += 1;
        self.max_stock = self.max_stock.max(record.stock_quantity);
    }
}

/// Group records by `key`, skipping records it maps to `None`
pub fn accumulate<'a, K, F>(records: &'a [Record], key: F) -> HashMap<K, GroupAccumulator<'a>>
where
    K: Eq + Hash,
    F: Fn(&'a Record) -> Option<K>,
{
    let mut groups: HashMap<K, GroupAccumulator<'a>> = HashMap::new();
    for record in records {
        let Some(k) = key(record) else { continue };
        groups
            .entry(k)
            .or_insert_with(|| GroupAccumulator::new(record))
            .add(record);
    }
    groups
}

/// Revenue per (country, product name), highest first
pub fn country_revenue(records: &[Record]) -> Vec<CountryRevenue> {
    let groups = accumulate(records, |r| {
        Some((r.country.as_str(), r.product_name.as_str()))
    });

    let mut rows: Vec<_> = groups
        .into_iter()
        .map(|((country, product_name), acc)| CountryRevenue {
            country: country.to_string(),
            product_name: product_name.to_string(),
            total_revenue: acc.revenue,
            transaction_count: acc.count,
        })
        .collect();

    rows.sort_unstable_by(|a, b| b.total_revenue.cmp(&a.total_revenue));
    rows
}

/// Units sold per product id, most sold first, at most `limit` rows
pub fn top_products(records: &[Record], limit: usize) -> Vec<ProductFrequency> {
    let groups = accumulate(records, |r| Some(r.product_id.as_str()));

    let mut rows: Vec<_> = groups
        .into_iter()
        .map(|(product_id, acc)| ProductFrequency {
            product_id: product_id.to_string(),
            product_name: acc.first.product_name.clone(),
            purchase_count: acc.quantity,
            stock_quantity: acc.max_stock,
        })
        .collect();

    rows.sort_unstable_by(|a, b| b.purchase_count.cmp(&a.purchase_count));
    rows.truncate(limit);
    rows
}

/// Sales volume per `YYYY-MM`, oldest month first
///
/// Undated records have no month and are left out.
pub fn monthly_sales(records: &[Record]) -> Vec<MonthlySales> {
    let groups = accumulate(records, Record::month);

    let mut rows: Vec<_> = groups
        .into_iter()
        .map(|(month, acc)| MonthlySales {
            month,
            sales_volume: acc.revenue,
            item_count: acc.quantity,
        })
        .collect();

    rows.sort_unstable_by(|a, b| a.month.cmp(&b.month));
    rows
}

/// Revenue per region, highest first, at most `limit` rows
pub fn top_regions(records: &[Record], limit: usize) -> Vec<RegionRevenue> {
    let groups = accumulate(records, |r| Some(r.region.as_str()));

    let mut rows: Vec<_> = groups
        .into_iter()
        .map(|(region, acc)| RegionRevenue {
            region: region.to_string(),
            total_revenue: acc.revenue,
            items_sold: acc.quantity,
        })
        .collect();

    rows.sort_unstable_by(|a, b| b.total_revenue.cmp(&a.total_revenue));
    rows.truncate(limit);
    rows
}

/// Computes the four views of a snapshot in parallel
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    product_limit: usize,
    region_limit: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            product_limit: TOP_PRODUCTS_LIMIT,
            region_limit: TOP_REGIONS_LIMIT,
        }
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, products: usize, regions: usize) -> Self {
        self.product_limit = products;
        self.region_limit = regions;
        self
    }

    /// Build a snapshot from records in source order
    ///
    /// Each view runs on its own blocking thread over a shared read-only
    /// slice; only the sorted rows come back.
    pub async fn aggregate(&self, records: Arc<[Record]>) -> Result<AggregateSnapshot, EngineError> {
        let started = Instant::now();
        let product_limit = self.product_limit;
        let region_limit = self.region_limit;

        let (country_revenue, top_products, monthly_sales, top_regions) = tokio::try_join!(
            run_view("country_revenue", &records, country_revenue),
            run_view("top_products", &records, move |r| top_products(r, product_limit)),
            run_view("monthly_sales", &records, monthly_sales),
            run_view("top_regions", &records, move |r| top_regions(r, region_limit)),
        )?;

        let elapsed = started.elapsed();
        info!(
            records = records.len(),
            countries = country_revenue.len(),
            months = monthly_sales.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Aggregation complete"
        );

        Ok(AggregateSnapshot {
            country_revenue,
            top_products,
            monthly_sales,
            top_regions,
            processing_time_ms: elapsed.as_millis() as u64,
            total_records: records.len(),
            cache_hit: false,
            generated_at: Utc::now(),
        })
    }
}

async fn run_view<T, F>(view: &'static str, records: &Arc<[Record]>, build: F) -> Result<T, EngineError>
where
    T: Send + 'static,
    F: FnOnce(&[Record]) -> T + Send + 'static,
{
    let records = Arc::clone(records);
    let rows = tokio::task::spawn_blocking(move || build(&records))
        .await
        .map_err(|source| EngineError::ViewFailed { view, source })?;
    debug!(view, "View computed");
    Ok(rows)
}
