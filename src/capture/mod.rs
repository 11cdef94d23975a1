pub mod file;

pub use file::FileSurface;

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::error::Result;
use crate::recording::RecordingFormat;

/// One encoded piece of the output stream, emitted on the fragment interval.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub data: Vec<u8>,
    /// Milliseconds since the encoder started.
    pub timestamp_ms: u64,
}

/// Live handle onto a running encoder.
///
/// `fragments` closes after the encoder has flushed its final fragment in
/// response to `stop`. Dropping the handle without signaling stop abandons
/// the encoder (component teardown).
pub struct EncoderHandle {
    pub fragments: mpsc::Receiver<Fragment>,
    pub stop: oneshot::Sender<()>,
}

/// A live-rendering video surface whose output stream can be captured.
///
/// Implementations wrap whatever actually renders the processed stream
/// (a decoder sink, a headless compositor, a test fake). The recorder owns
/// single-session enforcement; implementations only produce encoders.
#[async_trait::async_trait]
pub trait CaptureSurface: Send + Sync {
    /// Whether this surface supports output-stream capture at all.
    fn supports_capture(&self) -> bool;

    /// Whether the surface's encoder can produce the given format.
    fn supports_format(&self, format: &RecordingFormat) -> bool;

    /// Start an encoder emitting fragments of the negotiated format on the
    /// given interval.
    async fn start_encoder(
        &self,
        format: &RecordingFormat,
        fragment_interval: Duration,
    ) -> Result<EncoderHandle>;

    /// Surface name for logging
    fn name(&self) -> &str;
}
