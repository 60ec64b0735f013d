//! Layered error types for the ingestion core.
//!
//! This module provides a hierarchical error system:
//!
//! - [`DomainError`] - business/invariant violations (§7 "Contract" and
//!   "Invariant" rows)
//! - [`InfraError`] - infrastructure failures (§7 "Transient I/O" and
//!   "Configuration" rows)
//! - [`AppError`] - combines both; the `Result` alias every public
//!   operation returns
//!
//! # Error Philosophy
//!
//! - Domain errors are deterministic and should drive control flow (skip a
//!   chain, fail an `addMember`, drop an unparseable event).
//! - Infrastructure errors are retried with backoff by the caller; this
//!   module does not retry on their behalf.
//! - Fatal startup failures propagate all the way to `main` and set a
//!   non-zero exit code.

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Domain-level errors representing business logic or invariant violations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DomainError {
    /// A `SubscriptionBatch` already holds `MAX_PER_BATCH` members.
    #[error("batch {batch_index} on chain {chain_id} is at capacity ({max})")]
    CapacityExceeded {
        /// Chain the batch watches.
        chain_id: u64,
        /// Index of the batch within its worker.
        batch_index: usize,
        /// Configured capacity.
        max: usize,
    },

    /// A chain ID was referenced that this deployment does not support.
    #[error("unsupported chain id: {0}")]
    UnsupportedChain(u64),

    /// A domain event's routing key could not be parsed back into its
    /// component parts.
    #[error("unparseable routing key: {0}")]
    RoutingKeyUnparseable(String),

    /// A cron expression failed to parse.
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCronExpression {
        /// The offending expression.
        expression: String,
        /// Why the parser rejected it.
        reason: String,
    },

    /// An entity (position, pool, subscriber) was referenced but not found.
    #[error("{entity_type} not found: {entity_id}")]
    EntityNotFound {
        /// Kind of entity, e.g. `"position"`.
        entity_type: &'static str,
        /// The entity's identifier.
        entity_id: String,
    },

    /// A value outside the representable range was supplied for a typed
    /// primitive (e.g. a malformed address or decimal amount).
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// The field name that failed validation.
        field: &'static str,
        /// Why validation failed.
        reason: String,
    },

    /// An operation was requested that conflicts with the current state of
    /// a stateful component (e.g. `start()` on an already-running batch).
    #[error("{0}")]
    Conflict(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// INFRASTRUCTURE ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Infrastructure-level errors from external systems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InfraError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Chain RPC error (connection, timeout, malformed response).
    #[error("chain RPC error: {0}")]
    ChainRpc(#[from] chain_rpc::ChainRpcError),

    /// Message bus (AMQP) error.
    #[error("message bus error: {0}")]
    MessageBus(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(String),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Event decoding error.
    #[error("event decoding error: {0}")]
    EventDecoding(String),

    /// Resource not found in storage.
    #[error("resource not found")]
    NotFound,

    /// Connection pool exhausted.
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Timeout waiting for an operation.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Configuration file or environment error.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

// ═══════════════════════════════════════════════════════════════════════════════
// APPLICATION ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Application-level errors combining domain and infrastructure errors.
///
/// This is the primary error type used throughout the ingestion core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Infrastructure error.
    #[error(transparent)]
    Infra(#[from] InfraError),

    /// Chain reorganization invalidated previously published events.
    #[error("chain reorg detected at block {0}")]
    ReorgDetected(u64),

    /// Startup-time configuration problem; process should exit non-zero.
    #[error("configuration error: {0}")]
    Config(String),

    /// Fatal error during startup (bus unreachable after max retries, etc).
    #[error("initialization error: {0}")]
    Initialization(String),

    /// Graceful shutdown was requested and completed.
    #[error("shutdown requested")]
    ShutdownRequested,
}

/// Type alias for ingestion-core `Result`s.
pub type Result<T> = std::result::Result<T, AppError>;

// ═══════════════════════════════════════════════════════════════════════════════
// CONVENIENCE CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

impl From<crate::types::primitives::InvalidEthAddress> for DomainError {
    fn from(err: crate::types::primitives::InvalidEthAddress) -> Self {
        Self::InvalidValue {
            field: "address",
            reason: err.to_string(),
        }
    }
}

impl From<crate::types::primitives::InvalidChainId> for DomainError {
    fn from(err: crate::types::primitives::InvalidChainId) -> Self {
        Self::UnsupportedChain(err.0)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Infra(InfraError::Database(err))
    }
}

impl From<chain_rpc::ChainRpcError> for AppError {
    fn from(err: chain_rpc::ChainRpcError) -> Self {
        Self::Infra(InfraError::ChainRpc(err))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_display() {
        let err = DomainError::EntityNotFound {
            entity_type: "position",
            entity_id: "42".into(),
        };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn app_error_from_domain() {
        let domain = DomainError::UnsupportedChain(999);
        let app: AppError = domain.into();
        assert!(matches!(
            app,
            AppError::Domain(DomainError::UnsupportedChain(999))
        ));
    }

    #[test]
    fn app_error_from_infra() {
        let infra = InfraError::NotFound;
        let app: AppError = infra.into();
        assert!(matches!(app, AppError::Infra(InfraError::NotFound)));
    }

    #[test]
    fn capacity_exceeded_display() {
        let err = DomainError::CapacityExceeded {
            chain_id: 1,
            batch_index: 0,
            max: 1000,
        };
        assert!(err.to_string().contains("1000"));
    }
}
