//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FqiError {
    /// Invalid construction parameters, e.g. an action set with fewer than two actions.
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Row or column count mismatch in the given data.
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// The engine has not been fitted yet.
    #[error("Not fitted: {0}")]
    NotFittedError(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}

impl FqiError {
    /// Constructs [`FqiError::ConfigError`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Constructs [`FqiError::ShapeError`].
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeError(msg.into())
    }

    /// Constructs [`FqiError::NotFittedError`].
    pub fn not_fitted(msg: impl Into<String>) -> Self {
        Self::NotFittedError(msg.into())
    }
}
