//! # Transaction Generator
//!
//! Builds synthetic basket data from the catalog.
//!
//! ## Generation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Draw N in [1, max_items]                                            │
//! │  2. Sample N DISTINCT products from the catalog                         │
//! │  3. Give each line a quantity in [1, 3]                                 │
//! │  4. totalAmount = Σ unitPrice × quantity  (integer pence, exact)        │
//! │  5. Pick customer / store / till / payment method                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The generator owns its random source, so a seeded `StdRng` gives a
//! reproducible stream of records.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;
use uuid::Uuid;

use crate::catalog::{CATALOG, STORES, TILLS};
use crate::error::{CoreError, CoreResult};
use crate::types::{
    LineItem, PaymentMethod, TransactionEvent, TransactionRecord, CURRENCY_GBP,
    CUSTOMER_ID_PREFIX, TRANSACTION_ID_PREFIX,
};

/// Default upper bound on lines per basket.
pub const DEFAULT_MAX_ITEMS: usize = 8;

/// Largest quantity on a single line.
pub const MAX_QUANTITY: i64 = 3;

/// Customer number range (inclusive).
const CUSTOMER_RANGE: std::ops::RangeInclusive<u32> = 10_000..=99_999;

/// Generates transaction records and event envelopes.
pub struct TransactionGenerator<R: Rng = StdRng> {
    rng: R,
    max_items: usize,
}

impl TransactionGenerator<StdRng> {
    /// Generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible generator.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> TransactionGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        TransactionGenerator {
            rng,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    /// Changes the basket size cap.
    ///
    /// Fails if the catalog cannot supply that many distinct products.
    pub fn with_max_items(mut self, max_items: usize) -> CoreResult<Self> {
        if max_items == 0 || max_items > CATALOG.len() {
            return Err(CoreError::CatalogTooSmall {
                requested: max_items,
                available: CATALOG.len(),
            });
        }
        self.max_items = max_items;
        Ok(self)
    }

    /// A fresh record stamped with the current time.
    pub fn generate(&mut self) -> TransactionRecord {
        self.generate_at(Utc::now())
    }

    /// A fresh record stamped with `now`.
    pub fn generate_at(&mut self, now: DateTime<Utc>) -> TransactionRecord {
        let count = self.rng.gen_range(1..=self.max_items);

        let items: Vec<LineItem> = CATALOG
            .choose_multiple(&mut self.rng, count)
            .map(|product| LineItem {
                product_name: product.name.to_string(),
                product_code: product.code.to_string(),
                unit_price: product.price,
                quantity: self.rng.gen_range(1..=MAX_QUANTITY),
                category: product.category.to_string(),
            })
            .collect();

        let total_amount = items.iter().map(LineItem::line_total).sum();

        let record = TransactionRecord {
            transaction_id: self.next_transaction_id(),
            customer_id: format!(
                "{}{}",
                CUSTOMER_ID_PREFIX,
                self.rng.gen_range(CUSTOMER_RANGE)
            ),
            store_id: pick(&mut self.rng, &STORES).to_string(),
            till_id: pick(&mut self.rng, &TILLS).to_string(),
            payment_method: *pick(&mut self.rng, &PaymentMethod::ALL),
            total_amount,
            currency: CURRENCY_GBP.to_string(),
            timestamp: now,
            items,
        };

        debug!(
            transaction_id = %record.transaction_id,
            lines = record.items.len(),
            total = %record.total_amount,
            "Generated transaction"
        );

        record
    }

    /// A fresh record wrapped in an event envelope.
    pub fn generate_event(&mut self) -> TransactionEvent {
        let now = Utc::now();
        let record = self.generate_at(now);
        let event_id = self.next_uuid().to_string();
        TransactionEvent::wrap(record, event_id, now)
    }

    fn next_uuid(&mut self) -> Uuid {
        uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid()
    }

    /// `TXN-` + first 8 hex characters of a v4 UUID, upper-cased.
    fn next_transaction_id(&mut self) -> String {
        let hex = self.next_uuid().simple().to_string();
        format!("{}{}", TRANSACTION_ID_PREFIX, hex[..8].to_uppercase())
    }
}

fn pick<'a, T, R: Rng>(rng: &mut R, choices: &'a [T]) -> &'a T {
    &choices[rng.gen_range(0..choices.len())]
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_records_hold_invariants() {
        let mut gen = TransactionGenerator::seeded(42);

        for _ in 0..500 {
            let record = gen.generate();

            assert!(!record.items.is_empty());
            assert!(record.items.len() <= DEFAULT_MAX_ITEMS);
            assert_eq!(record.total_amount, record.computed_total());
            assert!(record.total_amount.is_positive());
            assert_eq!(record.currency, "GBP");

            let codes: HashSet<_> = record.items.iter().map(|i| &i.product_code).collect();
            assert_eq!(codes.len(), record.items.len(), "products must be distinct");

            for item in &record.items {
                assert!((1..=MAX_QUANTITY).contains(&item.quantity));
            }
        }
    }

    #[test]
    fn test_identifier_shapes() {
        let mut gen = TransactionGenerator::seeded(7);

        for _ in 0..100 {
            let record = gen.generate();

            let hex = record.transaction_id.strip_prefix("TXN-").unwrap();
            assert_eq!(hex.len(), 8);
            assert!(hex.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));

            let cust: u32 = record.customer_id.strip_prefix("CUST-").unwrap().parse().unwrap();
            assert!(CUSTOMER_RANGE.contains(&cust));

            assert!(STORES.contains(&record.store_id.as_str()));
            assert!(TILLS.contains(&record.till_id.as_str()));
        }
    }

    #[test]
    fn test_seeded_generators_repeat() {
        let now = Utc::now();
        let mut a = TransactionGenerator::seeded(99);
        let mut b = TransactionGenerator::seeded(99);
        assert_eq!(a.generate_at(now), b.generate_at(now));
    }

    #[test]
    fn test_event_envelope() {
        let mut gen = TransactionGenerator::seeded(3);
        let event = gen.generate_event();

        assert_eq!(event.event_type, "TRANSACTION_CREATED");
        assert_eq!(event.source, "till-system");
        assert_eq!(event.version, "1.0");
        assert_eq!(event.key(), event.data.transaction_id);

        let parsed = Uuid::parse_str(&event.event_id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_max_items_bounds() {
        assert!(TransactionGenerator::seeded(1).with_max_items(20).is_ok());
        assert!(matches!(
            TransactionGenerator::seeded(1).with_max_items(21),
            Err(CoreError::CatalogTooSmall { requested: 21, available: 20 })
        ));
        assert!(TransactionGenerator::seeded(1).with_max_items(0).is_err());

        let mut single = TransactionGenerator::seeded(5).with_max_items(1).unwrap();
        assert_eq!(single.generate().items.len(), 1);
    }
}
