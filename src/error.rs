//! Error types for the escrow engine
//!
//! Every failure a caller can observe is one of these variants. Validation,
//! permission and state-conflict errors are detected before any state is
//! touched; composite operations guarantee that an error is equivalent to
//! the operation never having started.

use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for escrow operations
#[derive(Error, Debug)]
pub enum EscrowError {
    /// Malformed input (non-positive amount, inverted budget range, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrong role, or acting on a resource the caller does not own
    #[error("permission denied: {0}")]
    Permission(String),

    /// Entity is not in the state required for the requested transition
    #[error("state conflict: {0}")]
    StateConflict(String),

    /// Debit or escrow hold exceeds the wallet balance
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// Referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl EscrowError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a permission error
    pub fn permission<S: Into<String>>(msg: S) -> Self {
        Self::Permission(msg.into())
    }

    /// Create a state conflict error
    pub fn state_conflict<S: Into<String>>(msg: S) -> Self {
        Self::StateConflict(msg.into())
    }

    /// Create an insufficient funds error
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}
