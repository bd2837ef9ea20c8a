//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Pre-submission record check failures           │
//! │                                                                         │
//! │  till-link errors (separate crate)                                     │
//! │  └── LinkError        - Transport and configuration failures           │
//! │                                                                         │
//! │  Response verdicts are NOT errors: a rejected API response is a        │
//! │  `ValidationVerdict` value (see `response`), so every reason can be    │
//! │  matched exhaustively.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested more distinct products than the catalog holds.
    #[error("Cannot pick {requested} distinct products from a catalog of {available}")]
    CatalogTooSmall { requested: usize, available: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Record validation errors.
///
/// Raised by [`crate::validation::validate_record`] before a record is sent,
/// so a malformed record never reaches the downstream API.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (wrong prefix, wrong shape).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Declared total differs from the sum of the line items.
    #[error("totalAmount {declared} does not match line items sum {computed}")]
    TotalMismatch { declared: String, computed: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result alias for domain operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
