//! Error types for the gateway.

use thiserror::Error;
use vidgate_access::AccessError;
use vidgate_core::{CoreError, RuleId, UserId, VideoId};
use vidgate_media::MediaError;
use vidgate_store::StoreError;

/// Errors that can occur during gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No usable identity on the request, or the identity names no account.
    #[error("not authenticated")]
    Unauthenticated,

    /// The account exists but is disabled.
    #[error("account disabled: {0}")]
    AccountDisabled(UserId),

    /// An admin-only operation was attempted by a non-admin.
    #[error("not authorized as an admin")]
    NotAdmin,

    /// No active rule covers the requested video.
    #[error("access denied or expired")]
    AccessDenied,

    /// Video not found.
    #[error("video not found: {0}")]
    VideoNotFound(VideoId),

    /// The video exists but its bytes do not.
    #[error("video file not found: {0}")]
    FileNotFound(String),

    /// Rule not found.
    #[error("access rule not found: {0}")]
    RuleNotFound(RuleId),

    /// User not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The request is malformed or carries invalid values.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// I/O error while reading media.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AccessError> for GatewayError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::VideoNotFound(id) => GatewayError::VideoNotFound(id),
            AccessError::Store(e) => GatewayError::Store(e),
            AccessError::Audit(msg) => GatewayError::Internal(msg),
        }
    }
}

impl From<MediaError> for GatewayError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::FileNotFound(r) => GatewayError::FileNotFound(r),
            MediaError::Io(e) => GatewayError::Io(e),
        }
    }
}

impl From<CoreError> for GatewayError {
    fn from(e: CoreError) -> Self {
        GatewayError::InvalidRequest(e.to_string())
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
