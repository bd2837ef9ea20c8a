//! # Till Simulator
//!
//! REST till: self-tests the transactions API, then submits one generated
//! transaction per interval and validates every response before trusting it.
//!
//! ## Modules
//! - [`probes`] - Startup self-test and its results table
//! - [`runner`] - TESTING → RUNNING → TERMINATED state machine
//! - [`stats`] - Run counters

pub mod probes;
pub mod runner;
pub mod stats;

#[cfg(test)]
mod fake_api;

pub use probes::SelfTestReport;
pub use runner::{Outcome, RunState, Simulator};
pub use stats::RunStats;
