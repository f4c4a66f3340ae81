//! Error types for Tandem Core

use crate::binding::{FullscreenFailure, PlayFailureReason};
use crate::types::TrackKind;
use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Controller error types
#[derive(Error, Debug)]
pub enum Error {
    // Binding errors
    #[error("Invalid start offset for {track} track: {value}")]
    InvalidOffset { track: TrackKind, value: f64 },

    #[error("Invalid media source: {0}")]
    InvalidSource(String),

    #[error("Media elements are already bound")]
    AlreadyBound,

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // Media command errors
    #[error("Play request rejected by {track} track: {reason}")]
    PlayRejected {
        track: TrackKind,
        reason: PlayFailureReason,
    },

    #[error("Fullscreen request rejected: {0}")]
    FullscreenRejected(FullscreenFailure),

    // Session errors
    #[error("Media metadata not ready after {waited_ms}ms")]
    LoadingTimeout { waited_ms: u64 },

    #[error("Session has been torn down")]
    SessionClosed,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the session survives this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::PlayRejected { .. }
                | Error::FullscreenRejected(_)
                | Error::LoadingTimeout { .. }
        )
    }

    /// Returns the error code for notices and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidOffset { .. } => "INVALID_OFFSET",
            Error::InvalidSource(_) => "INVALID_SOURCE",
            Error::AlreadyBound => "ALREADY_BOUND",
            Error::Url(_) => "INVALID_URL",
            Error::PlayRejected { .. } => "PLAY_REJECTED",
            Error::FullscreenRejected(_) => "FULLSCREEN_REJECTED",
            Error::LoadingTimeout { .. } => "LOADING_TIMEOUT",
            Error::SessionClosed => "SESSION_CLOSED",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}
