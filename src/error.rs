//! Error types for Limitlab
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Limitlab operations
///
/// Each variant maps onto one HTTP status class at the API boundary, so
/// handlers can downcast an `anyhow::Error` and answer with the right code.
#[derive(Error, Debug)]
pub enum LimitlabError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request payload failed validation
    #[error("{0}")]
    Validation(String),

    /// Session, student, or timer does not exist
    #[error("{0}")]
    NotFound(String),

    /// Write conflicts with existing data
    #[error("{0}")]
    Conflict(String),

    /// Destructive operation attempted without explicit confirmation
    #[error("{message}")]
    ConfirmationRequired {
        /// Instruction telling the caller how to confirm
        message: String,
        /// What the operation would destroy
        warning: String,
    },

    /// Database errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for Limitlab operations
///
/// Uses `anyhow::Error` so callers can attach context; the API layer
/// recovers the `LimitlabError` variant by downcasting.
pub type Result<T> = anyhow::Result<T>;
