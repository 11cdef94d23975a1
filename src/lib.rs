pub mod capture;
pub mod config;
pub mod error;
pub mod publish;
pub mod recording;
pub mod session;
pub mod upload;

pub use capture::{CaptureSurface, EncoderHandle, FileSurface, Fragment};
pub use config::{Config, RecordingConfig, UploadConfig};
pub use error::{GenStreamError, Result};
pub use publish::{TransportPublisher, WebRtcConfig};
pub use recording::{RecordedArtifact, Recorder, RecordingFormat, RecordingState};
pub use session::{StreamParams, StreamSession, StreamSessionClient};
pub use upload::{
    AssetStatus, ProcessingStatus, StudioBackend, StudioClient, UploadPhase, UploadProgress,
    UploadTicket, Uploader,
};
