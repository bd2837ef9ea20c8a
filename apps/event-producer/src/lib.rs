//! # Event Producer
//!
//! Rate-limited publisher of `TRANSACTION_CREATED` events.

pub mod runner;

pub use runner::{EventSink, Producer, PublishStats};
