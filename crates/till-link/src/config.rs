//! # Simulator Configuration
//!
//! Environment-driven configuration for both binaries.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     API_BASE_URL=http://transactions-api:8080                          │
//! │     KAFKA_BOOTSTRAP_SERVERS=kafka:29092                                │
//! │                                                                         │
//! │  2. Default Values (lowest priority)                                   │
//! │     See the table below                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Variable | Default |
//! |---|---|
//! | `API_BASE_URL` | `http://localhost:8080` |
//! | `SIMULATION_INTERVAL_SECONDS` | `1` |
//! | `TILL_SELFTEST_ALLOWED_FAILURES` | `1` |
//! | `TILL_STATS_STORE_ID` | `STORE-001` |
//! | `TILL_MAX_RESPONSE_AGE_SECS` | `300` |
//! | `KAFKA_BOOTSTRAP_SERVERS` | `kafka:29092` |
//! | `KAFKA_TOPIC` | `transactions` |
//! | `MESSAGES_PER_SECOND` | `5` |
//! | `KAFKA_PUBLISH_RETRIES` | `3` |
//!
//! An unparseable value is a configuration error and the binary refuses to
//! start. Unset or blank variables take the default.

use std::str::FromStr;
use std::time::Duration;

use tracing::debug;
use url::Url;

use till_core::response::ValidationPolicy;

use crate::error::{LinkError, LinkResult};

// =============================================================================
// Environment Lookup
// =============================================================================

/// Reads the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> LinkResult<T> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            debug!(key, value = %raw, "Overriding from environment");
            raw.trim()
                .parse()
                .map_err(|_| LinkError::InvalidConfig(format!("{key} has invalid value '{raw}'")))
        }
        _ => Ok(default),
    }
}

fn string_var(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
        _ => default.to_string(),
    }
}

// =============================================================================
// Till Simulator Configuration
// =============================================================================

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;
pub const DEFAULT_ALLOWED_FAILURES: usize = 1;
pub const DEFAULT_STATS_STORE_ID: &str = "STORE-001";
pub const DEFAULT_MAX_RESPONSE_AGE_SECS: i64 = 300;

/// Configuration for the HTTP till simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Base URL of the transactions API, without trailing slash.
    pub api_base_url: String,
    /// Pause between submissions.
    pub interval: Duration,
    /// Self-test failures tolerated before refusing to run.
    pub selftest_allowed_failures: usize,
    /// Store id used for the stats probe.
    pub stats_store_id: String,
    /// Oldest acceptable response timestamp, in seconds.
    pub max_response_age_secs: i64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            interval: Duration::from_secs_f64(DEFAULT_INTERVAL_SECS),
            selftest_allowed_failures: DEFAULT_ALLOWED_FAILURES,
            stats_store_id: DEFAULT_STATS_STORE_ID.to_string(),
            max_response_age_secs: DEFAULT_MAX_RESPONSE_AGE_SECS,
        }
    }
}

impl SimulatorConfig {
    /// Loads from the process environment.
    pub fn load() -> LinkResult<Self> {
        Self::from_lookup(process_env)
    }

    /// Loads from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LinkResult<Self> {
        let interval_secs: f64 =
            parse_var(&lookup, "SIMULATION_INTERVAL_SECONDS", DEFAULT_INTERVAL_SECS)?;
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(LinkError::InvalidConfig(
                "SIMULATION_INTERVAL_SECONDS must be greater than 0".into(),
            ));
        }

        let config = SimulatorConfig {
            api_base_url: string_var(&lookup, "API_BASE_URL", DEFAULT_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            interval: Duration::from_secs_f64(interval_secs),
            selftest_allowed_failures: parse_var(
                &lookup,
                "TILL_SELFTEST_ALLOWED_FAILURES",
                DEFAULT_ALLOWED_FAILURES,
            )?,
            stats_store_id: string_var(&lookup, "TILL_STATS_STORE_ID", DEFAULT_STATS_STORE_ID),
            max_response_age_secs: parse_var(
                &lookup,
                "TILL_MAX_RESPONSE_AGE_SECS",
                DEFAULT_MAX_RESPONSE_AGE_SECS,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> LinkResult<()> {
        let url = Url::parse(&self.api_base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(LinkError::InvalidUrl(format!(
                "API base URL must start with http:// or https://, got: {}",
                self.api_base_url
            )));
        }
        if url.host_str().is_none() {
            return Err(LinkError::InvalidUrl(format!(
                "API base URL has no host: {}",
                self.api_base_url
            )));
        }

        if self.interval.is_zero() {
            return Err(LinkError::InvalidConfig(
                "interval must be greater than 0".into(),
            ));
        }

        if self.max_response_age_secs <= 0 {
            return Err(LinkError::InvalidConfig(
                "TILL_MAX_RESPONSE_AGE_SECS must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Response validation policy for this configuration.
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy::default().with_max_age_secs(self.max_response_age_secs)
    }
}

// =============================================================================
// Event Producer Configuration
// =============================================================================

pub const DEFAULT_BOOTSTRAP_SERVERS: &str = "kafka:29092";
pub const DEFAULT_TOPIC: &str = "transactions";
pub const DEFAULT_MESSAGES_PER_SECOND: f64 = 5.0;
pub const DEFAULT_PUBLISH_RETRIES: u32 = 3;
pub const DEFAULT_CLIENT_ID: &str = "till-event-producer";

/// Configuration for the Kafka event producer.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// `host:port` seeds; the first reachable one answers metadata.
    pub bootstrap_servers: Vec<String>,
    pub topic: String,
    pub messages_per_second: f64,
    /// Attempts after the first failure.
    pub publish_retries: u32,
    pub client_id: String,
    pub connect_timeout: Duration,
    /// Time allowed for one acknowledged publish.
    pub request_timeout: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        ProducerConfig {
            bootstrap_servers: vec![DEFAULT_BOOTSTRAP_SERVERS.to_string()],
            topic: DEFAULT_TOPIC.to_string(),
            messages_per_second: DEFAULT_MESSAGES_PER_SECOND,
            publish_retries: DEFAULT_PUBLISH_RETRIES,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ProducerConfig {
    /// Loads from the process environment.
    pub fn load() -> LinkResult<Self> {
        Self::from_lookup(process_env)
    }

    /// Loads from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LinkResult<Self> {
        let servers = string_var(&lookup, "KAFKA_BOOTSTRAP_SERVERS", DEFAULT_BOOTSTRAP_SERVERS);

        let config = ProducerConfig {
            bootstrap_servers: servers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            topic: string_var(&lookup, "KAFKA_TOPIC", DEFAULT_TOPIC),
            messages_per_second: parse_var(
                &lookup,
                "MESSAGES_PER_SECOND",
                DEFAULT_MESSAGES_PER_SECOND,
            )?,
            publish_retries: parse_var(&lookup, "KAFKA_PUBLISH_RETRIES", DEFAULT_PUBLISH_RETRIES)?,
            ..ProducerConfig::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> LinkResult<()> {
        if self.bootstrap_servers.is_empty() {
            return Err(LinkError::InvalidConfig(
                "KAFKA_BOOTSTRAP_SERVERS must name at least one broker".into(),
            ));
        }
        for server in &self.bootstrap_servers {
            let valid = server
                .rsplit_once(':')
                .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
                .unwrap_or(false);
            if !valid {
                return Err(LinkError::InvalidConfig(format!(
                    "bootstrap server must be host:port, got: {server}"
                )));
            }
        }

        if self.topic.is_empty() {
            return Err(LinkError::InvalidConfig("KAFKA_TOPIC must not be empty".into()));
        }

        if !self.messages_per_second.is_finite() || self.messages_per_second <= 0.0 {
            return Err(LinkError::InvalidConfig(
                "MESSAGES_PER_SECOND must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Pause between publishes.
    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.messages_per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_simulator_defaults() {
        let config = SimulatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.selftest_allowed_failures, 1);
        assert_eq!(config.stats_store_id, "STORE-001");
        assert_eq!(config.validation_policy().max_age, chrono::Duration::seconds(300));
    }

    #[test]
    fn test_simulator_overrides() {
        let config = SimulatorConfig::from_lookup(lookup(&[
            ("API_BASE_URL", "https://api.example.com/"),
            ("SIMULATION_INTERVAL_SECONDS", "0.5"),
            ("TILL_SELFTEST_ALLOWED_FAILURES", "0"),
            ("TILL_MAX_RESPONSE_AGE_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.interval, Duration::from_millis(500));
        assert_eq!(config.selftest_allowed_failures, 0);
        assert_eq!(config.validation_policy().max_age, chrono::Duration::seconds(60));
    }

    #[test]
    fn test_simulator_rejects_bad_values() {
        let err = SimulatorConfig::from_lookup(lookup(&[("API_BASE_URL", "ftp://files")]))
            .unwrap_err();
        assert!(err.is_config_error());

        let err = SimulatorConfig::from_lookup(lookup(&[("API_BASE_URL", "not a url")]))
            .unwrap_err();
        assert!(err.is_config_error());

        let err =
            SimulatorConfig::from_lookup(lookup(&[("SIMULATION_INTERVAL_SECONDS", "0")]))
                .unwrap_err();
        assert!(matches!(err, LinkError::InvalidConfig(_)));

        let err =
            SimulatorConfig::from_lookup(lookup(&[("SIMULATION_INTERVAL_SECONDS", "fast")]))
                .unwrap_err();
        assert!(matches!(err, LinkError::InvalidConfig(_)));

        assert!(
            SimulatorConfig::from_lookup(lookup(&[("TILL_SELFTEST_ALLOWED_FAILURES", "-1")]))
                .is_err()
        );
    }

    #[test]
    fn test_producer_defaults() {
        let config = ProducerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bootstrap_servers, vec!["kafka:29092".to_string()]);
        assert_eq!(config.topic, "transactions");
        assert_eq!(config.publish_retries, 3);
        assert_eq!(config.publish_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_producer_server_list() {
        let config = ProducerConfig::from_lookup(lookup(&[(
            "KAFKA_BOOTSTRAP_SERVERS",
            "broker-1:9092, broker-2:9092,",
        )]))
        .unwrap();
        assert_eq!(config.bootstrap_servers, vec!["broker-1:9092", "broker-2:9092"]);
    }

    #[test]
    fn test_producer_rejects_bad_values() {
        assert!(ProducerConfig::from_lookup(lookup(&[("MESSAGES_PER_SECOND", "0")])).is_err());
        assert!(ProducerConfig::from_lookup(lookup(&[("MESSAGES_PER_SECOND", "-2")])).is_err());
        assert!(
            ProducerConfig::from_lookup(lookup(&[("KAFKA_BOOTSTRAP_SERVERS", "no-port")])).is_err()
        );
        assert!(
            ProducerConfig::from_lookup(lookup(&[("KAFKA_BOOTSTRAP_SERVERS", " , ")])).is_err()
        );
    }
}
