//! Error types for media delivery.

use thiserror::Error;

/// Errors that can occur while serving video bytes.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The video record exists but its bytes are not on disk.
    #[error("video file not found: {0}")]
    FileNotFound(String),

    /// I/O error reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for media operations.
pub type Result<T> = std::result::Result<T, MediaError>;
