use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const HEADER: &str = "transaction_id,transaction_date,user_id,country,region,product_id,product_name,category,price,quantity,total_price,stock_quantity,added_date\n";

const COUNTRIES: [&str; 6] = ["USA", "Canada", "Germany", "Japan", "Brazil", "India"];
const CATEGORIES: [&str; 4] = ["Electronics", "Clothing", "Books", "Home"];

/// Generate a transaction CSV with the specified parameters
///
/// Roughly `invalid_ratio` of the rows carry a negative quantity so they
/// fail parsing.
pub fn generate_csv_dataset(
    num_records: usize,
    num_products: usize,
    num_regions: usize,
    invalid_ratio: f64,
) -> String {
    let mut csv = String::with_capacity(num_records * 120);
    csv.push_str(HEADER);
    let invalid_every = if invalid_ratio > 0.0 {
        (1.0 / invalid_ratio).round().max(1.0) as usize
    } else {
        usize::MAX
    };

    for i in 0..num_records {
        let country = COUNTRIES[i % COUNTRIES.len()];
        let category = CATEGORIES[i % CATEGORIES.len()];
        let product = i % num_products.max(1);
        let region = i % num_regions.max(1);
        let month = i % 12 + 1;
        let day = i % 28 + 1;
        let quantity: i64 = if i > 0 && i % invalid_every == 0 {
            -1
        } else {
            (i % 5 + 1) as i64
        };
        let price = format!("{}.{:02}", i % 500 + 1, i % 100);

        csv.push_str(&format!(
            "TX{i:08},2023-{month:02}-{day:02},U{},{country},{country}-R{region},P{product},Product {product},{category},{price},{quantity},{price},{},2022-01-01\n",
            i % 10_000,
            i % 300,
        ));
    }

    csv
}

/// Generate a CSV dataset and write it to a file
pub fn generate_csv_file<P: AsRef<Path>>(
    path: P,
    num_records: usize,
    num_products: usize,
    num_regions: usize,
) -> std::io::Result<()> {
    let csv = generate_csv_dataset(num_records, num_products, num_regions, 0.0);
    let mut file = File::create(path)?;
    file.write_all(csv.as_bytes())?;
    Ok(())
}
