//! Modifier construction and runtime errors

use thiserror::Error;

/// Errors raised by modifier constructors and lifecycle callbacks.
///
/// Construction errors are fatal at recipe load. Runtime errors abort
/// the current scheduling call and propagate to the host loop unchanged;
/// the engine never retries a mutation to model state.
#[derive(Debug, Error)]
pub enum ModifierError {
    #[error("modifier '{tag}' missing required parameter '{key}'")]
    MissingParam { tag: String, key: String },

    #[error("modifier '{tag}' parameter '{key}': {reason}")]
    InvalidParam {
        tag: String,
        key: String,
        reason: String,
    },

    #[error("model has no parameter named '{0}'")]
    UnknownModelParam(String),

    #[error("{0}")]
    Runtime(String),
}

/// Result type for modifier operations
pub type Result<T> = std::result::Result<T, ModifierError>;
