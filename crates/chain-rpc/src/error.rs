//! Error types for chain RPC operations.
//!
//! This module provides the error hierarchy for [`crate::traits::ChainRpc`]
//! implementations:
//!
//! - [`ChainRpcError`] - The primary error type for all RPC operations
//!
//! # Error Philosophy
//!
//! These errors are designed to be:
//! - **Actionable**: Each variant tells you what went wrong
//! - **Convertible**: Easy to convert from underlying alloy errors
//! - **Chain-agnostic**: Same error types regardless of the underlying chain

use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`ChainRpcError`].
pub type Result<T> = std::result::Result<T, ChainRpcError>;

/// Errors that can occur when using a [`crate::traits::ChainRpc`] implementation.
///
/// # Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | Network | `Connection`, `Timeout` | Network issues, server down |
/// | Protocol | `Rpc`, `Unsupported` | Server rejected request |
/// | Data | `InvalidResponse`, `Encoding` | Malformed data |
/// | Configuration | `InvalidConfig` | Programmer error |
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChainRpcError {
    /// Failed to establish connection to the RPC endpoint.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request timed out waiting for a response.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// JSON-RPC error returned by the server.
    #[error("RPC error ({code}): {message}")]
    Rpc {
        /// JSON-RPC error code (e.g., -32005 for limit exceeded).
        code: i64,
        /// Human-readable error message from the server.
        message: String,
    },

    /// The requested operation is not supported by this provider or chain.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// The log subscription closed unexpectedly.
    #[error("subscription closed: {0}")]
    SubscriptionClosed(String),

    /// Failed to encode or decode call data or logs.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Response was valid but had unexpected structure.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration provided to the provider.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic provider error wrapping underlying implementation errors.
    #[error("provider error: {0}")]
    Other(String),
}

impl ChainRpcError {
    /// Create an RPC error from code and message.
    #[must_use]
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
        }
    }

    /// Create an unsupported operation error.
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported(operation.into())
    }

    /// Check if this error is likely transient and retryable.
    ///
    /// Returns `true` for network issues and timeouts that might succeed on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) | Self::SubscriptionClosed(_) => true,
            Self::Rpc { code, .. } => {
                *code == -32005 // Limit exceeded
                    || *code == -32000 // Server error (generic)
            }
            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONVERSIONS FROM alloy ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

impl From<alloy::transports::TransportError> for ChainRpcError {
    fn from(err: alloy::transports::TransportError) -> Self {
        // String-based because alloy doesn't expose structured transport error
        // variants for every transport.
        let msg = err.to_string();
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
            Self::Connection(format!("request timed out: {msg}"))
        } else if msg_lower.contains("connection")
            || msg_lower.contains("connect")
            || msg_lower.contains("refused")
        {
            Self::Connection(msg)
        } else {
            Self::Other(msg)
        }
    }
}

impl From<alloy::contract::Error> for ChainRpcError {
    fn from(err: alloy::contract::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<alloy::sol_types::Error> for ChainRpcError {
    fn from(err: alloy::sol_types::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_retryable() {
        let timeout = ChainRpcError::Timeout(Duration::from_secs(30));
        assert!(timeout.is_retryable());

        let connection = ChainRpcError::Connection("connection refused".into());
        assert!(connection.is_retryable());

        let rpc_limit = ChainRpcError::rpc(-32005, "rate limited");
        assert!(rpc_limit.is_retryable());

        let unsupported = ChainRpcError::unsupported("multicall");
        assert!(!unsupported.is_retryable());
    }

    #[test]
    fn subscription_closed_is_retryable() {
        let closed = ChainRpcError::SubscriptionClosed("stream ended".into());
        assert!(closed.is_retryable());
    }
}
