use thiserror::Error;

/// Custom error types for the capture/stream/upload pipeline
#[derive(Debug, Error)]
pub enum GenStreamError {
    /// Recorder errors
    #[error("Surface does not support output-stream capture: {0}")]
    UnsupportedCapture(String),

    #[error("No supported recording format among the preference list")]
    NoSupportedFormat,

    #[error("A recording is already in progress on this surface")]
    RecordingInProgress,

    #[error("No active recording to stop")]
    NoActiveRecording,

    #[error("Encoder did not confirm stop within {0:?}")]
    StopTimeout(std::time::Duration),

    #[error("Recording produced no fragments")]
    EmptyRecording,

    #[error("Recording artifact is implausibly small ({size} bytes, minimum {min})")]
    UndersizedRecording { size: usize, min: usize },

    /// Uploader errors
    #[error("Failed to request upload ticket: {0}")]
    TicketRequest(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Remote processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Remote processing did not reach a terminal state after {attempts} polls")]
    ProcessingTimeout { attempts: u32 },

    /// Stream session and signaling errors
    #[error("Stream session request failed: {0}")]
    SessionRequest(String),

    #[error("Invalid SDP format: {0}")]
    InvalidSdp(String),

    #[error("Publish handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Failed to create peer connection: {0}")]
    PeerConnectionCreation(String),

    /// Catch-all for unexpected failures
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results using GenStreamError
pub type Result<T> = std::result::Result<T, GenStreamError>;

impl GenStreamError {
    /// Helper to create Internal errors with context
    pub fn internal(msg: impl Into<String>) -> Self {
        GenStreamError::Internal(msg.into())
    }

    /// Helper to create Upload errors with context
    pub fn upload(msg: impl Into<String>) -> Self {
        GenStreamError::Upload(msg.into())
    }
}

/// Convert webrtc::Error to GenStreamError
impl From<webrtc::Error> for GenStreamError {
    fn from(err: webrtc::Error) -> Self {
        GenStreamError::HandshakeFailed(err.to_string())
    }
}

/// Transport-level failures without a more specific mapping
impl From<reqwest::Error> for GenStreamError {
    fn from(err: reqwest::Error) -> Self {
        GenStreamError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GenStreamError::ProcessingFailed("input file rejected".to_string());
        assert_eq!(err.to_string(), "Remote processing failed: input file rejected");
    }

    #[test]
    fn test_undersized_display_carries_sizes() {
        let err = GenStreamError::UndersizedRecording { size: 12, min: 1000 };
        assert!(err.to_string().contains("12 bytes"));
        assert!(err.to_string().contains("1000"));
    }

    #[test]
    fn test_error_helpers() {
        let err = GenStreamError::internal("Something went wrong");
        assert!(matches!(err, GenStreamError::Internal(_)));
    }
}
