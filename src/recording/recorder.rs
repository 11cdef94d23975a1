use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::capture::{CaptureSurface, Fragment};
use crate::config::RecordingConfig;
use crate::error::{GenStreamError, Result};

use super::format::{RecordingFormat, FORMAT_PREFERENCES};
use super::state::RecordingState;
use super::webm;

/// Finalized recording output. Immutable once produced.
#[derive(Debug, Clone)]
pub struct RecordedArtifact {
    pub data: Vec<u8>,
    /// Measured wall-clock recording time
    pub duration: Duration,
    pub format: RecordingFormat,
}

impl RecordedArtifact {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub async fn write_to(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, &self.data).await.map_err(|e| {
            GenStreamError::internal(format!("Failed to write artifact to disk: {}", e))
        })
    }
}

struct ActiveSession {
    collector: JoinHandle<Vec<Fragment>>,
    stop: tokio::sync::oneshot::Sender<()>,
    started_at: Instant,
    format: RecordingFormat,
}

/// Turns a live-rendering surface into a durable encoded artifact.
///
/// At most one recording session is active per surface instance; a second
/// `start` is rejected, not queued.
pub struct Recorder {
    surface: Arc<dyn CaptureSurface>,
    config: RecordingConfig,
    session: Mutex<Option<ActiveSession>>,
    state: Mutex<RecordingState>,
}

impl Recorder {
    pub fn new(surface: Arc<dyn CaptureSurface>, config: RecordingConfig) -> Self {
        Self {
            surface,
            config,
            session: Mutex::new(None),
            state: Mutex::new(RecordingState::Idle),
        }
    }

    pub async fn state(&self) -> RecordingState {
        self.state.lock().await.clone()
    }

    /// Negotiate a format and begin fragment collection.
    pub async fn start(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Err(GenStreamError::RecordingInProgress);
        }

        if !self.surface.supports_capture() {
            return Err(GenStreamError::UnsupportedCapture(
                self.surface.name().to_string(),
            ));
        }

        let format = FORMAT_PREFERENCES
            .iter()
            .find(|f| self.surface.supports_format(f))
            .cloned()
            .ok_or(GenStreamError::NoSupportedFormat)?;

        let handle = self
            .surface
            .start_encoder(&format, self.config.fragment_interval)
            .await?;

        let mut fragments_rx = handle.fragments;
        let collector = tokio::spawn(async move {
            let mut fragments = Vec::new();
            while let Some(fragment) = fragments_rx.recv().await {
                tracing::debug!(
                    bytes = fragment.data.len(),
                    timestamp_ms = fragment.timestamp_ms,
                    "Collected fragment"
                );
                fragments.push(fragment);
            }
            fragments
        });

        tracing::info!(
            surface = %self.surface.name(),
            format = %format,
            interval_ms = self.config.fragment_interval.as_millis() as u64,
            "Recording started"
        );

        *session = Some(ActiveSession {
            collector,
            stop: handle.stop,
            started_at: Instant::now(),
            format,
        });
        *self.state.lock().await = RecordingState::Recording;
        Ok(())
    }

    /// Request a final flush, wait for the encoder to drain, finalize.
    pub async fn stop(&self) -> Result<RecordedArtifact> {
        let active = self
            .session
            .lock()
            .await
            .take()
            .ok_or(GenStreamError::NoActiveRecording)?;
        *self.state.lock().await = RecordingState::Stopping;

        // Encoder may already be gone; the collector timeout covers that too
        let _ = active.stop.send(());

        let collector_abort = active.collector.abort_handle();
        let fragments =
            match tokio::time::timeout(self.config.stop_timeout, active.collector).await {
                Ok(Ok(fragments)) => fragments,
                Ok(Err(e)) => {
                    self.fail(format!("Fragment collector panicked: {}", e)).await;
                    return Err(GenStreamError::internal(format!(
                        "Fragment collector panicked: {}",
                        e
                    )));
                }
                Err(_) => {
                    collector_abort.abort();
                    self.fail("Encoder never confirmed stop".to_string()).await;
                    return Err(GenStreamError::StopTimeout(self.config.stop_timeout));
                }
            };

        let duration = active.started_at.elapsed();

        if fragments.is_empty() {
            self.fail("Recording produced no fragments".to_string()).await;
            return Err(GenStreamError::EmptyRecording);
        }

        let mut data = Vec::with_capacity(fragments.iter().map(|f| f.data.len()).sum());
        for fragment in &fragments {
            data.extend_from_slice(&fragment.data);
        }

        if data.len() < self.config.min_artifact_bytes {
            self.fail(format!("Artifact only {} bytes", data.len())).await;
            return Err(GenStreamError::UndersizedRecording {
                size: data.len(),
                min: self.config.min_artifact_bytes,
            });
        }

        // Best-effort: a repair failure degrades to the unrepaired artifact
        if active.format.webm {
            match webm::repair_duration(&mut data, duration) {
                Ok(()) => tracing::debug!(
                    duration_ms = duration.as_millis() as u64,
                    "Patched container duration"
                ),
                Err(e) => tracing::warn!(
                    error = %e,
                    "Duration repair failed, returning unrepaired artifact"
                ),
            }
        }

        *self.state.lock().await = RecordingState::Stopped;
        tracing::info!(
            fragments = fragments.len(),
            bytes = data.len(),
            duration_ms = duration.as_millis() as u64,
            format = %active.format,
            "Recording stopped"
        );

        Ok(RecordedArtifact {
            data,
            duration,
            format: active.format,
        })
    }

    /// Best-effort teardown: stops an in-flight recording and discards its
    /// fragments. Does nothing when idle.
    pub async fn teardown(&self) {
        if let Some(active) = self.session.lock().await.take() {
            let _ = active.stop.send(());
            active.collector.abort();
            *self.state.lock().await = RecordingState::Stopped;
            tracing::info!("Recording torn down, fragments discarded");
        }
    }

    async fn fail(&self, reason: String) {
        *self.state.lock().await = RecordingState::Error(reason);
    }
}
