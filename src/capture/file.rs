use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::error::{GenStreamError, Result};
use crate::recording::RecordingFormat;

use super::{CaptureSurface, EncoderHandle, Fragment};

const DEFAULT_CHUNK_BYTES: usize = 64 * 1024;

/// Replays a pre-encoded WebM file as a live capture surface, one chunk per
/// fragment interval. Used for headless runs and batch re-processing; the
/// fragments are byte slices of an already-muxed container, so they behave
/// exactly like interval-driven encoder output.
pub struct FileSurface {
    path: PathBuf,
    chunk_bytes: usize,
}

impl FileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }
}

#[async_trait::async_trait]
impl CaptureSurface for FileSurface {
    fn supports_capture(&self) -> bool {
        self.path.is_file()
    }

    fn supports_format(&self, format: &RecordingFormat) -> bool {
        // The file is already muxed; any WebM flavor passes through
        format.webm
    }

    async fn start_encoder(
        &self,
        format: &RecordingFormat,
        fragment_interval: Duration,
    ) -> Result<EncoderHandle> {
        let data = tokio::fs::read(&self.path).await.map_err(|e| {
            GenStreamError::internal(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))
        })?;
        tracing::debug!(
            path = %self.path.display(),
            bytes = data.len(),
            format = %format,
            "Replaying file as capture surface"
        );

        let (tx, rx) = mpsc::channel(64);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let chunk_bytes = self.chunk_bytes;
        let interval_ms = fragment_interval.as_millis() as u64;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(fragment_interval);
            let mut offset = 0usize;
            let mut tick = 0u64;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if offset < data.len() {
                            let end = (offset + chunk_bytes).min(data.len());
                            let fragment = Fragment {
                                data: data[offset..end].to_vec(),
                                timestamp_ms: tick * interval_ms,
                            };
                            offset = end;
                            tick += 1;
                            if tx.send(fragment).await.is_err() {
                                break;
                            }
                        }
                    }
                    _ = &mut stop_rx => {
                        // Final flush of whatever has not been emitted yet
                        if offset < data.len() {
                            let _ = tx
                                .send(Fragment {
                                    data: data[offset..].to_vec(),
                                    timestamp_ms: tick * interval_ms,
                                })
                                .await;
                        }
                        break;
                    }
                }
            }
        });

        Ok(EncoderHandle {
            fragments: rx,
            stop: stop_tx,
        })
    }

    fn name(&self) -> &str {
        "file-replay"
    }
}
