use std::io;

use framefeed_capture::ConfigError;
use thiserror::Error;

/// Errors returned synchronously by [`crate::Device`] operations.
///
/// Failures that happen while producing a frame never surface here; they
/// end up in the state of the buffer concerned.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("device busy: stream is running")]
    Busy,
    #[error("stream already running")]
    AlreadyRunning,
    #[error("stream not running")]
    NotRunning,
    #[error("no completed buffer available")]
    WouldBlock,
    #[error("failed to spawn producer thread: {0}")]
    Spawn(#[from] io::Error),
}

impl DeviceError {
    /// Stable string code for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            DeviceError::InvalidArgument(_) => "invalid_argument",
            DeviceError::Busy => "busy",
            DeviceError::AlreadyRunning => "already_running",
            DeviceError::NotRunning => "not_running",
            DeviceError::WouldBlock => "would_block",
            DeviceError::Spawn(_) => "spawn_failed",
        }
    }

    /// Whether the error may succeed when retried.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            DeviceError::Busy | DeviceError::WouldBlock | DeviceError::Spawn(_)
        )
    }
}

impl From<ConfigError> for DeviceError {
    fn from(err: ConfigError) -> Self {
        DeviceError::InvalidArgument(err.to_string())
    }
}
