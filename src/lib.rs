pub mod integration;
pub mod remote;
pub mod speech;
pub mod turns;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatterError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Voice capture is already active")]
    AlreadyActive,

    #[error("Message is empty")]
    EmptyInput,

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for ChatterError {
    fn from(e: std::io::Error) -> Self {
        ChatterError::IOError(e.to_string())
    }
}

impl From<toml::de::Error> for ChatterError {
    fn from(e: toml::de::Error) -> Self {
        ChatterError::Config(e.to_string())
    }
}

impl ChatterError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Caller misuse, retrying later is fine
            ChatterError::Conflict(_) => true,
            ChatterError::AlreadyActive => true,
            ChatterError::EmptyInput => true,
            // Internal inconsistency
            ChatterError::NotFound(_) => false,
            // Platform lacks the capability for the whole session
            ChatterError::Unsupported(_) => false,
            // Platform hiccups and failed round trips
            ChatterError::Capture(_) => true,
            ChatterError::Playback(_) => true,
            ChatterError::Network(_) => true,
            ChatterError::Remote(_) => true,
            ChatterError::Config(_) => false,
            ChatterError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            ChatterError::Conflict(_) => {
                "Please wait for the current request to finish.".to_string()
            }
            ChatterError::NotFound(_) => "Something went wrong. Please try again.".to_string(),
            ChatterError::Unsupported(_) => {
                "Speech recognition is not supported on this device.".to_string()
            }
            ChatterError::AlreadyActive => "Already listening.".to_string(),
            ChatterError::EmptyInput => "Type a message first.".to_string(),
            ChatterError::Capture(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            ChatterError::Playback(_) => {
                "Voice playback failed. Responses will be shown as text.".to_string()
            }
            ChatterError::Network(_) => {
                "Could not reach the assistant. Please check your connection.".to_string()
            }
            // The backend's own message is the most useful thing to show
            ChatterError::Remote(message) => message.clone(),
            ChatterError::Config(_) => "Configuration error. Please check settings.".to_string(),
            ChatterError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(ChatterError::Network("timeout".into()).is_recoverable());
        assert!(ChatterError::Conflict("busy".into()).is_recoverable());
        assert!(!ChatterError::NotFound("temp-1".into()).is_recoverable());
        assert!(!ChatterError::Unsupported("stt".into()).is_recoverable());
    }

    #[test]
    fn test_remote_message_passes_through() {
        let err = ChatterError::Remote("Quota exceeded".into());
        assert_eq!(err.user_message(), "Quota exceeded");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ChatterError = io.into();
        assert!(matches!(err, ChatterError::IOError(_)));
    }
}
