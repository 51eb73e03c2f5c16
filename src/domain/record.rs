use chrono::{Datelike, NaiveDate};

use super::error::DomainError;
use super::money::Money;

/// Parsed transaction row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub transaction_id: String,
    pub transaction_date: Option<NaiveDate>,
    pub user_id: String,
    pub country: String,
    pub region: String,
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub price: Money,
    pub quantity: u32,
    pub total_price: Money,
    pub stock_quantity: u32,
    pub added_date: Option<NaiveDate>,
}

impl Record {
    /// Check the record invariants: mandatory id, non-negative money
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.transaction_id.is_empty() {
            return Err(DomainError::MissingTransactionId);
        }
        if self.price.is_negative() {
            return Err(DomainError::NegativeValue("price"));
        }
        if self.total_price.is_negative() {
            return Err(DomainError::NegativeValue("total_price"));
        }
        if self.quantity == 0 {
            return Err(DomainError::NonPositiveQuantity(0));
        }
        Ok(())
    }

    /// Calendar month bucket in `YYYY-MM` form, `None` for undated records
    pub fn month(&self) -> Option<String> {
        self.transaction_date
            .map(|date| format!("{:04}-{:02}", date.year(), date.month()))
    }
}

/// Convert a signed quantity into a positive count
pub fn positive_quantity(value: i64) -> Result<u32, DomainError> {
    if value <= 0 {
        return Err(DomainError::NonPositiveQuantity(value));
    }
    u32::try_from(value).map_err(|_| DomainError::Overflow)
}

/// Convert a signed stock reading into a non-negative count
pub fn stock_level(value: i64) -> Result<u32, DomainError> {
    if value < 0 {
        return Err(DomainError::NegativeValue("stock_quantity"));
    }
    u32::try_from(value).map_err(|_| DomainError::Overflow)
}
