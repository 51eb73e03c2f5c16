use thiserror::Error;

/// Domain-level errors representing record invariant violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Missing transaction id")]
    MissingTransactionId,

    #[error("Negative value for {0}")]
    NegativeValue(&'static str),

    #[error("Quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Arithmetic overflow")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats_correctly() {
        assert_eq!(
            DomainError::MissingTransactionId.to_string(),
            "Missing transaction id"
        );
        assert_eq!(
            DomainError::NegativeValue("price").to_string(),
            "Negative value for price"
        );
        assert_eq!(
            DomainError::NonPositiveQuantity(0).to_string(),
            "Quantity must be positive, got 0"
        );
        assert_eq!(DomainError::InvalidAmount.to_string(), "Invalid amount");
        assert_eq!(DomainError::Overflow.to_string(), "Arithmetic overflow");
    }

    #[test]
    fn error_comparison_works() {
        assert_eq!(DomainError::Overflow, DomainError::Overflow.clone());
        assert_ne!(DomainError::Overflow, DomainError::InvalidAmount);
    }
}
