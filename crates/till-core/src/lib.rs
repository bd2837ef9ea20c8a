//! # till-core: Pure Domain Logic for the Till Simulators
//!
//! Everything the simulators decide, with no I/O: what a transaction looks
//! like, how one is generated, whether it is fit to send, and whether the
//! API's answer can be trusted.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Sim Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        apps/till-simulator          apps/event-producer         │   │
//! │  │   self-test ──► run loop          rate-limited publish loop     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                till-link (HTTP + Kafka transports)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ raw (status, body)                     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ generator │  │validation │  │ response  │  │  recency  │  │   │
//! │  │   │  catalog  │  │  record   │  │  verdict  │  │ FIFO set  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • `now` IS AN ARGUMENT                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - TransactionRecord, LineItem, TransactionEvent
//! - [`money`] - Money in integer pence
//! - [`catalog`] - The 20-product range, stores and tills
//! - [`generator`] - Seedable record and event generator
//! - [`validation`] - Pre-submission record checks
//! - [`response`] - The response validator and its verdicts
//! - [`recency`] - Bounded set of recently accepted ids
//! - [`selfcheck`] - Probe record and bypass fixtures
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use till_core::generator::TransactionGenerator;
//! use till_core::response::{validate_response, ValidationPolicy};
//!
//! let mut generator = TransactionGenerator::seeded(7);
//! let record = generator.generate();
//!
//! let body = format!(
//!     r#"{{"status":"success","message":"Transaction processed successfully",
//!          "transactionId":"{}","timestamp":"{}"}}"#,
//!     record.transaction_id,
//!     Utc::now().to_rfc3339(),
//! );
//!
//! let verdict = validate_response(&record, 200, &body, Utc::now(), &ValidationPolicy::default());
//! assert!(verdict.accepted);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod generator;
pub mod money;
pub mod recency;
pub mod response;
pub mod selfcheck;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use generator::TransactionGenerator;
pub use money::Money;
pub use recency::RecencySet;
pub use response::{validate_response, RejectReason, ValidationPolicy, ValidationVerdict};
pub use types::*;
