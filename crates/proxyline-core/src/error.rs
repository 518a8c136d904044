// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Proxyline SMS relay.

use thiserror::Error;

/// The primary error type used across all Proxyline crates.
///
/// Allocation and lookup errors are returned to the immediate caller;
/// [`ProxylineError::Mail`] is best-effort by contract and is logged at the
/// call site rather than propagated.
#[derive(Debug, Error)]
pub enum ProxylineError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Telephony provider errors other than sync and purchase (SMS send, malformed response).
    #[error("telephony provider error: {message}")]
    Telephony {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The provider's owned-number inventory could not be listed.
    ///
    /// Allocation treats this as soft: it falls back to the locally cached
    /// pool instead of failing outright.
    #[error("provider inventory sync failed: {message}")]
    Sync {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A number purchase call failed at the provider. Never retried automatically.
    #[error("number purchase failed: {message}")]
    PurchaseFailed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No free or releasable number exists and the provider had nothing to sell.
    #[error("no proxy number available for allocation")]
    NoPhoneAvailable,

    /// The pool is at its configured cap and nothing could be released.
    #[error("proxy number pool is at its configured cap of {cap}")]
    MaxNumbersExceeded { cap: usize },

    /// An entity lookup missed. Returned as-is to the caller, never retried.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Operational alert mail could not be delivered. Logged, never propagated.
    #[error("alert mail delivery failed: {message}")]
    Mail {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Caller-supplied input failed validation (empty roster, unknown member, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A bounded provider call exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxylineError {
    /// Wrap a storage-layer error source.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Shorthand for a lookup miss.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Whether the failure was caused by the caller (bad input, lookup miss)
    /// rather than by the system (provider outage, capacity, storage).
    ///
    /// Transport layers map client errors to 4xx-style responses and system
    /// errors to retryable 5xx-style responses.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_distinguished_from_system_errors() {
        assert!(ProxylineError::not_found("conversation", "c-1").is_client_error());
        assert!(ProxylineError::InvalidInput("empty roster".into()).is_client_error());

        assert!(!ProxylineError::NoPhoneAvailable.is_client_error());
        assert!(!ProxylineError::MaxNumbersExceeded { cap: 5 }.is_client_error());
        assert!(
            !ProxylineError::Sync {
                message: "listing failed".into(),
                source: None,
            }
            .is_client_error()
        );
        assert!(!ProxylineError::storage(std::io::Error::other("disk")).is_client_error());
    }

    #[test]
    fn error_messages_name_the_failing_operation() {
        let err = ProxylineError::MaxNumbersExceeded { cap: 5 };
        assert_eq!(
            err.to_string(),
            "proxy number pool is at its configured cap of 5"
        );

        let err = ProxylineError::not_found("proxy number", "+15550000");
        assert_eq!(err.to_string(), "proxy number not found: +15550000");
    }
}
