//! Error types for access evaluation.

use thiserror::Error;
use vidgate_core::VideoId;
use vidgate_store::StoreError;

/// Errors that can occur while evaluating access.
///
/// A denied decision is not an error; see [`crate::Decision`].
#[derive(Debug, Error)]
pub enum AccessError {
    /// The requested video does not exist.
    #[error("video not found: {0}")]
    VideoNotFound(VideoId),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Audit sink failure.
    #[error("audit sink error: {0}")]
    Audit(String),
}

/// Result type for access operations.
pub type Result<T> = std::result::Result<T, AccessError>;
