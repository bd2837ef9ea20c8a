//! # Record Validation
//!
//! Checks a generated record before it leaves the till.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Type System (compile-time)                                    │
//! │  └── PaymentMethod is an enum, Money is integer pence                   │
//! │                                                                         │
//! │  Layer 2: Record Validation (this module, runtime)                      │
//! │  └── Identifier prefixes, currency, positive amounts, total invariant   │
//! │                                                                         │
//! │  Layer 3: Response Validation (`response` module)                       │
//! │  └── What the API sends back                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Returns the FIRST error found; the caller skips the record.

use crate::error::ValidationError;
use crate::types::{
    LineItem, TransactionRecord, CURRENCY_GBP, CUSTOMER_ID_PREFIX, STORE_ID_PREFIX,
    TILL_ID_PREFIX, TRANSACTION_ID_PREFIX,
};

// =============================================================================
// Record Validation
// =============================================================================

/// Validates a transaction record before submission.
///
/// ## Example
/// ```rust
/// use till_core::generator::TransactionGenerator;
/// use till_core::validation::validate_record;
///
/// let record = TransactionGenerator::seeded(1).generate();
/// assert!(validate_record(&record).is_ok());
/// ```
pub fn validate_record(record: &TransactionRecord) -> Result<(), ValidationError> {
    validate_prefixed("transactionId", &record.transaction_id, TRANSACTION_ID_PREFIX)?;
    validate_prefixed("customerId", &record.customer_id, CUSTOMER_ID_PREFIX)?;
    validate_prefixed("storeId", &record.store_id, STORE_ID_PREFIX)?;
    validate_prefixed("tillId", &record.till_id, TILL_ID_PREFIX)?;

    if record.currency != CURRENCY_GBP {
        return Err(ValidationError::NotAllowed {
            field: "currency".to_string(),
            allowed: vec![CURRENCY_GBP.to_string()],
        });
    }

    if !record.total_amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "totalAmount".to_string(),
        });
    }

    if record.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    for (index, item) in record.items.iter().enumerate() {
        validate_line(index, item)?;
    }

    let computed = record.computed_total();
    if computed != record.total_amount {
        return Err(ValidationError::TotalMismatch {
            declared: record.total_amount.to_string(),
            computed: computed.to_string(),
        });
    }

    Ok(())
}

fn validate_line(index: usize, item: &LineItem) -> Result<(), ValidationError> {
    if item.product_code.trim().is_empty() {
        return Err(ValidationError::Required {
            field: format!("items[{index}].productCode"),
        });
    }
    if item.product_name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: format!("items[{index}].productName"),
        });
    }
    if !item.unit_price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: format!("items[{index}].unitPrice"),
        });
    }
    if item.quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: format!("items[{index}].quantity"),
        });
    }
    Ok(())
}

fn validate_prefixed(field: &str, value: &str, prefix: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if !value.starts_with(prefix) || value.len() == prefix.len() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("must start with {prefix}"),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::TransactionGenerator;
    use crate::money::Money;

    fn record() -> TransactionRecord {
        TransactionGenerator::seeded(11).generate()
    }

    #[test]
    fn test_generated_record_is_valid() {
        let mut gen = TransactionGenerator::seeded(12);
        for _ in 0..100 {
            assert!(validate_record(&gen.generate()).is_ok());
        }
    }

    #[test]
    fn test_bad_prefix() {
        let mut r = record();
        r.till_id = "T-1".to_string();
        assert!(matches!(
            validate_record(&r),
            Err(ValidationError::InvalidFormat { field, .. }) if field == "tillId"
        ));

        let mut r = record();
        r.transaction_id = "TXN-".to_string();
        assert!(matches!(
            validate_record(&r),
            Err(ValidationError::InvalidFormat { field, .. }) if field == "transactionId"
        ));

        let mut r = record();
        r.customer_id = String::new();
        assert!(matches!(validate_record(&r), Err(ValidationError::Required { .. })));
    }

    #[test]
    fn test_currency_must_be_gbp() {
        let mut r = record();
        r.currency = "EUR".to_string();
        assert!(matches!(validate_record(&r), Err(ValidationError::NotAllowed { .. })));
    }

    #[test]
    fn test_empty_items() {
        let mut r = record();
        r.items.clear();
        assert!(matches!(
            validate_record(&r),
            Err(ValidationError::Required { field }) if field == "items"
        ));
    }

    #[test]
    fn test_non_positive_line_values() {
        let mut r = record();
        r.items[0].quantity = 0;
        assert!(matches!(validate_record(&r), Err(ValidationError::MustBePositive { .. })));

        let mut r = record();
        r.items[0].unit_price = Money::zero();
        assert!(matches!(validate_record(&r), Err(ValidationError::MustBePositive { .. })));
    }

    #[test]
    fn test_total_mismatch() {
        let mut r = record();
        r.total_amount = r.total_amount + Money::from_pence(1);
        assert!(matches!(validate_record(&r), Err(ValidationError::TotalMismatch { .. })));
    }
}
