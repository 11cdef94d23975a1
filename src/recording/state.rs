use serde::{Deserialize, Serialize};

/// Lifecycle of a single recording session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingState {
    Idle,
    Recording,
    Stopping,
    Stopped,
    Error(String),
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

impl RecordingState {
    /// A session in this state holds a live encoder.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Stopping)
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Error(_))
    }
}
