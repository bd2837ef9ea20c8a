//! # Domain Types
//!
//! Wire-level records produced by the simulators.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐        ┌─────────────────────┐                │
//! │  │  TransactionEvent   │        │  TransactionRecord  │                │
//! │  │  ─────────────────  │  data  │  ─────────────────  │                │
//! │  │  eventId (UUID)     │───────►│  transactionId      │                │
//! │  │  eventType          │        │  customerId         │                │
//! │  │  eventTimestamp     │        │  storeId / tillId   │                │
//! │  │  source / version   │        │  paymentMethod      │                │
//! │  └─────────────────────┘        │  totalAmount (GBP)  │                │
//! │   Kafka topic payload           │  items ─────────────┼──► LineItem[]  │
//! │                                 └─────────────────────┘                │
//! │                                  REST submit payload                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All JSON field names are camelCase to match the downstream API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Prefix of every transaction id.
pub const TRANSACTION_ID_PREFIX: &str = "TXN-";

/// Prefix of every customer id.
pub const CUSTOMER_ID_PREFIX: &str = "CUST-";

/// Prefix of every store id.
pub const STORE_ID_PREFIX: &str = "STORE-";

/// Prefix of every till id.
pub const TILL_ID_PREFIX: &str = "TILL-";

/// The only currency the tills trade in.
pub const CURRENCY_GBP: &str = "GBP";

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Chip and PIN.
    Card,
    /// Notes and coins.
    Cash,
    /// Tap to pay.
    Contactless,
}

impl PaymentMethod {
    /// Every method, in a stable order.
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Card,
        PaymentMethod::Cash,
        PaymentMethod::Contactless,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Contactless => "contactless",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A line on the receipt.
///
/// Product data is a snapshot of the catalog entry at generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_name: String,
    pub product_code: String,
    /// Unit price (serialized as decimal pounds).
    pub unit_price: Money,
    pub quantity: i64,
    pub category: String,
}

impl LineItem {
    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Transaction Record
// =============================================================================

/// One till transaction, as posted to `/api/transactions/submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// `TXN-` + 8 upper-case hex characters.
    pub transaction_id: String,
    /// `CUST-` + 5 digits.
    pub customer_id: String,
    pub store_id: String,
    pub till_id: String,
    pub payment_method: PaymentMethod,
    /// Always equal to the sum of the line totals.
    pub total_amount: Money,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<LineItem>,
}

impl TransactionRecord {
    /// Sum of line totals.
    pub fn computed_total(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Total number of units across all lines.
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

// =============================================================================
// Transaction Event
// =============================================================================

/// Event type carried by every published envelope.
pub const EVENT_TYPE_TRANSACTION_CREATED: &str = "TRANSACTION_CREATED";

/// Source system name carried by every published envelope.
pub const EVENT_SOURCE: &str = "till-system";

/// Envelope schema version.
pub const EVENT_VERSION: &str = "1.0";

/// Envelope published to the transactions topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    /// UUID v4.
    pub event_id: String,
    pub event_type: String,
    pub event_timestamp: DateTime<Utc>,
    pub source: String,
    pub version: String,
    pub data: TransactionRecord,
}

impl TransactionEvent {
    /// Wraps a record in a fresh envelope.
    pub fn wrap(data: TransactionRecord, event_id: String, at: DateTime<Utc>) -> Self {
        TransactionEvent {
            event_id,
            event_type: EVENT_TYPE_TRANSACTION_CREATED.to_string(),
            event_timestamp: at,
            source: EVENT_SOURCE.to_string(),
            version: EVENT_VERSION.to_string(),
            data,
        }
    }

    /// Partition key: the transaction id.
    pub fn key(&self) -> &str {
        &self.data.transaction_id
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
