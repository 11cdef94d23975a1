pub mod format;
pub mod recorder;
pub mod state;
pub mod webm;

pub use format::{RecordingFormat, FORMAT_PREFERENCES};
pub use recorder::{RecordedArtifact, Recorder};
pub use state::RecordingState;
