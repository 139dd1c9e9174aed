//! Error types for vidgate core.

use thiserror::Error;

/// Errors raised while validating core data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::types::IdParseError),

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("invalid video date: {year}-{month}-{day}")]
    InvalidDate { year: i32, month: u8, day: u8 },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
