use chrono::{NaiveDate, NaiveDateTime};
use csv_async::StringRecord;

use super::error::IoError;
use crate::domain::{DomainError, Money, Record, positive_quantity, stock_level};

/// One CSV row as read from input, fields not yet interpreted
pub type RawRow = StringRecord;

/// Columns every row must carry; the trailing `added_date` is optional
pub const MIN_COLUMNS: usize = 12;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse one positional row into a validated [`Record`]
///
/// Column order: transaction_id, transaction_date, user_id, country, region,
/// product_id, product_name, category, price, quantity, total_price,
/// stock_quantity, [added_date].
pub fn parse_row(row: &RawRow) -> Result<Record, IoError> {
    if row.len() < MIN_COLUMNS {
        return Err(IoError::InsufficientColumns {
            got: row.len(),
            need: MIN_COLUMNS,
        });
    }

    let field = |idx: usize| row.get(idx).map(str::trim).unwrap_or_default();

    let transaction_id = field(0);
    if transaction_id.is_empty() {
        return Err(DomainError::MissingTransactionId.into());
    }

    let transaction_date = match field(1) {
        "" => None,
        raw => Some(parse_date(raw).ok_or_else(|| IoError::invalid("transaction_date", raw))?),
    };

    let record = Record {
        transaction_id: transaction_id.to_string(),
        transaction_date,
        user_id: field(2).to_string(),
        country: field(3).to_string(),
        region: field(4).to_string(),
        product_id: field(5).to_string(),
        product_name: field(6).to_string(),
        category: field(7).to_string(),
        price: parse_money("price", field(8))?,
        quantity: positive_quantity(parse_int("quantity", field(9))?)?,
        total_price: parse_money("total_price", field(10))?,
        stock_quantity: stock_level(parse_int("stock_quantity", field(11))?)?,
        // An unreadable added date is not worth dropping the row for
        added_date: Some(field(12)).filter(|s| !s.is_empty()).and_then(parse_date),
    };

    record.validate()?;
    Ok(record)
}

/// Parse a date in any of the accepted layouts
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_money(field: &'static str, raw: &str) -> Result<Money, IoError> {
    if raw.is_empty() {
        return Ok(Money::ZERO);
    }
    Money::from_decimal_str(raw).map_err(|_| IoError::invalid(field, raw))
}

fn parse_int(field: &'static str, raw: &str) -> Result<i64, IoError> {
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(|_| IoError::invalid(field, raw))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::RawRow;

    /// Build a raw row from string fields
    pub fn raw_row(fields: &[&str]) -> RawRow {
        let mut row = RawRow::new();
        for field in fields {
            row.push_field(field);
        }
        row
    }

    /// A well-formed row for the given id
    pub fn valid_fields(id: &str) -> Vec<String> {
        [
            id,
            "2023-01-15",
            "U456",
            "USA",
            "California",
            "P789",
            "Test Product",
            "Electronics",
            "299.99",
            "2",
            "599.98",
            "100",
            "2022-12-01",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}
