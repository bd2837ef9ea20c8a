//! # Recency Set
//!
//! Bounded memory of recently accepted transaction ids.
//!
//! ```text
//!   insert ──►  [ newest ... oldest ]  ──► evicted when len > capacity
//!                  VecDeque (order)
//!                  HashSet  (lookup)
//! ```
//!
//! Used only to warn when the API echoes an id it already confirmed.

use std::collections::{HashSet, VecDeque};

/// Default number of ids remembered.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Fixed-capacity FIFO set of ids.
#[derive(Debug, Clone)]
pub struct RecencySet {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl Default for RecencySet {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RecencySet {
    /// Capacity is clamped to at least 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RecencySet {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Records an id. Returns `true` if it was already present.
    ///
    /// A repeat does not refresh the id's position.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.members.contains(id) {
            return true;
        }

        self.order.push_back(id.to_string());
        self.members.insert(id.to_string());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        false
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
