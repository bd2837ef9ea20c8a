//! # till-link: Transports for the Till Simulators
//!
//! Network edges of the simulators: the transactions REST API over reqwest
//! and the Kafka wire protocol over a plain tokio socket. Everything here
//! returns [`LinkError`] so callers can ask one question: retry or give up.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Sim Link Layer                              │
//! │                                                                         │
//! │   apps/till-simulator                    apps/event-producer            │
//! │          │                                        │                     │
//! │          ▼                                        ▼                     │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │   ApiClient    │  │  Diagnostics   │  │    KafkaPublisher      │    │
//! │  │                │  │                │  │                        │    │
//! │  │ POST submit    │─►│ latency,       │  │ metadata → leader      │    │
//! │  │ GET health     │  │ cache headers, │  │ murmur2 partitioning   │    │
//! │  │ GET stats      │  │ body size      │  │ acks=all, retries      │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐                                │
//! │  │    Config      │  │   LinkError    │                                │
//! │  │  env + defaults│  │  retryable?    │                                │
//! │  └────────────────┘  └────────────────┘                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Environment configuration for both binaries
//! - [`http`] - Transactions API client
//! - [`diagnostics`] - Advisory checks on raw HTTP responses
//! - [`kafka`] - Acknowledged Kafka publisher
//! - [`partitioner`] - Kafka-compatible murmur2 key partitioning
//! - [`error`] - Link error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod kafka;
pub mod partitioner;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ProducerConfig, SimulatorConfig};
pub use diagnostics::Diagnostic;
pub use error::{LinkError, LinkResult};
pub use http::{ApiClient, RawResponse};
pub use kafka::{KafkaPublisher, PublishAck};
