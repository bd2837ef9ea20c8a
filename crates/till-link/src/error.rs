//! # Link Error Types
//!
//! Error types for transport and configuration failures.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Link Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  Codec                  │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  SerializationFailed    │ │
//! │  │                 │  │  Http           │  │  Broker (error code)    │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  A non-200 HTTP status is NOT a LinkError: the response goes back to   │
//! │  the caller and the validator classifies it.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Link error type covering every transport and configuration failure.
#[derive(Debug, Error)]
pub enum LinkError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the peer.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request did not complete in time.
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Timed out below us, with no deadline of ours to report.
    #[error("Timed out: {0}")]
    TimedOut(String),

    /// Any other HTTP client failure.
    #[error("HTTP error: {0}")]
    Http(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Failed to serialize a payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Kafka frame could not be encoded or decoded.
    #[error("Kafka codec error: {0}")]
    Codec(String),

    /// Broker answered with a non-zero error code.
    #[error("Broker error {code} for {topic}/{partition}")]
    Broker {
        topic: String,
        partition: i32,
        code: i16,
    },

    /// Topic or partition has no known leader.
    #[error("No leader for {topic}/{partition}")]
    NoLeader { topic: String, partition: i32 },

    /// Publish gave up after the retry budget.
    #[error("Publish failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for LinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LinkError::TimedOut(err.to_string())
        } else if err.is_connect() {
            LinkError::ConnectionFailed(err.to_string())
        } else if err.is_builder() {
            LinkError::InvalidUrl(err.to_string())
        } else {
            LinkError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(err: serde_json::Error) -> Self {
        LinkError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for LinkError {
    fn from(err: url::ParseError) -> Self {
        LinkError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => LinkError::TimedOut(err.to_string()),
            _ => LinkError::ConnectionFailed(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for LinkError {
    fn from(err: anyhow::Error) -> Self {
        LinkError::Codec(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

/// Broker error codes that mean cached leadership is stale.
///
/// 3 UNKNOWN_TOPIC_OR_PARTITION, 5 LEADER_NOT_AVAILABLE,
/// 6 NOT_LEADER_OR_FOLLOWER.
pub const METADATA_REFRESH_CODES: [i16; 3] = [3, 5, 6];

/// Broker error codes worth another attempt.
///
/// Adds 7 REQUEST_TIMED_OUT, 19 NOT_ENOUGH_REPLICAS,
/// 20 NOT_ENOUGH_REPLICAS_AFTER_APPEND.
const RETRYABLE_BROKER_CODES: [i16; 6] = [3, 5, 6, 7, 19, 20];

impl LinkError {
    /// Returns true if the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::ConnectionFailed(_)
            | LinkError::Timeout(_)
            | LinkError::TimedOut(_)
            | LinkError::Http(_)
            | LinkError::NoLeader { .. } => true,
            LinkError::Broker { code, .. } => RETRYABLE_BROKER_CODES.contains(code),
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(self, LinkError::InvalidConfig(_) | LinkError::InvalidUrl(_))
    }

    /// Returns true if cached broker metadata should be discarded.
    pub fn needs_metadata_refresh(&self) -> bool {
        match self {
            LinkError::Broker { code, .. } => METADATA_REFRESH_CODES.contains(code),
            LinkError::NoLeader { .. } | LinkError::ConnectionFailed(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(LinkError::ConnectionFailed("refused".into()).is_retryable());
        assert!(LinkError::Timeout(5000).is_retryable());
        assert!(LinkError::Broker {
            topic: "transactions".into(),
            partition: 0,
            code: 6
        }
        .is_retryable());

        assert!(!LinkError::InvalidConfig("bad".into()).is_retryable());
        assert!(!LinkError::Codec("short frame".into()).is_retryable());
        assert!(!LinkError::Broker {
            topic: "transactions".into(),
            partition: 0,
            code: 10
        }
        .is_retryable());
    }

    #[test]
    fn test_timeout_messages() {
        assert_eq!(LinkError::Timeout(5000).to_string(), "Timed out after 5000 ms");
        assert!(!LinkError::TimedOut("read".into()).to_string().contains("0 ms"));
    }

    #[test]
    fn test_config_errors() {
        assert!(LinkError::InvalidUrl("ftp://x".into()).is_config_error());
        assert!(!LinkError::Timeout(1).is_config_error());
    }

    #[test]
    fn test_metadata_refresh() {
        let err = LinkError::Broker {
            topic: "t".into(),
            partition: 2,
            code: 3,
        };
        assert!(err.needs_metadata_refresh());
        assert_eq!(err.to_string(), "Broker error 3 for t/2");

        let err = LinkError::Broker {
            topic: "t".into(),
            partition: 2,
            code: 7,
        };
        assert!(!err.needs_metadata_refresh());
    }

    #[test]
    fn test_io_conversion() {
        let err: LinkError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert!(matches!(err, LinkError::TimedOut(_)));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Timed out: slow");

        let err: LinkError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "nope").into();
        assert!(matches!(err, LinkError::ConnectionFailed(_)));
    }
}
