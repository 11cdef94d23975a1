use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::config::UploadConfig;
use crate::error::{GenStreamError, Result};
use crate::recording::RecordedArtifact;

use super::client::StudioBackend;
use super::ticket::{ProcessingStatus, UploadTicket};

/// Uploader lifecycle. Once polling begins the uploader never re-enters
/// the uploading phase.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadPhase {
    Idle,
    RequestingTicket,
    Uploading,
    Polling,
    Ready,
    Failed,
    TimedOut,
}

/// Progress events reported to the caller during an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadProgress {
    /// Byte-level transfer progress
    BytesUploaded { sent: u64, total: u64 },
    /// Bytes are delivered and the server began transcoding. Fired exactly
    /// once, at the first observed `processing` status.
    ProcessingStarted,
    /// One status poll completed
    StatusPolled {
        attempt: u32,
        status: ProcessingStatus,
    },
}

/// Delivers a recorded artifact to the backend collaborator and awaits
/// processing completion.
///
/// Single-flight: each uploader instance performs at most one upload.
/// There is no mid-flight cancellation; dropping the future orphans the
/// remote artifact rather than deleting it.
pub struct Uploader<B: StudioBackend> {
    backend: Arc<B>,
    config: UploadConfig,
    phase: Mutex<UploadPhase>,
}

impl<B: StudioBackend> Uploader<B> {
    pub fn new(backend: Arc<B>, config: UploadConfig) -> Self {
        Self {
            backend,
            config,
            phase: Mutex::new(UploadPhase::Idle),
        }
    }

    pub async fn phase(&self) -> UploadPhase {
        self.phase.lock().await.clone()
    }

    /// Run the full upload: ticket, transfer, status polling. Resolves with
    /// the final playable identifier.
    pub async fn upload(
        &self,
        artifact: &RecordedArtifact,
        on_progress: impl Fn(UploadProgress),
    ) -> Result<String> {
        {
            let mut phase = self.phase.lock().await;
            if *phase != UploadPhase::Idle {
                return Err(GenStreamError::internal(
                    "Uploader already consumed; create a new one per attempt",
                ));
            }
            *phase = UploadPhase::RequestingTicket;
        }

        let ticket = match self.backend.request_upload().await {
            Ok(ticket) => ticket,
            Err(e @ GenStreamError::TicketRequest(_)) => {
                self.set_phase(UploadPhase::Failed).await;
                return Err(e);
            }
            Err(other) => {
                self.set_phase(UploadPhase::Failed).await;
                return Err(GenStreamError::TicketRequest(other.to_string()));
            }
        };

        self.set_phase(UploadPhase::Uploading).await;
        if let Err(e) = self.transfer(&ticket, artifact, &on_progress).await {
            self.set_phase(UploadPhase::Failed).await;
            return Err(e);
        }

        self.set_phase(UploadPhase::Polling).await;
        self.poll(&ticket, &on_progress).await
    }

    /// Resumable chunked transfer when offered, direct write as fallback.
    async fn transfer(
        &self,
        ticket: &UploadTicket,
        artifact: &RecordedArtifact,
        on_progress: &impl Fn(UploadProgress),
    ) -> Result<()> {
        let data = &artifact.data;
        let total = data.len() as u64;

        if let Some(endpoint) = &ticket.resumable_endpoint {
            match self.transfer_chunked(endpoint, data, total, on_progress).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Resumable upload failed, trying direct write"
                    );
                }
            }
        }

        if let Some(url) = &ticket.upload_url {
            self.backend.upload_direct(url, data).await?;
            on_progress(UploadProgress::BytesUploaded { sent: total, total });
            tracing::info!(bytes = total, "Direct write complete");
            return Ok(());
        }

        Err(GenStreamError::upload(
            "Ticket offered no usable upload endpoint",
        ))
    }

    async fn transfer_chunked(
        &self,
        endpoint: &str,
        data: &[u8],
        total: u64,
        on_progress: &impl Fn(UploadProgress),
    ) -> Result<()> {
        let mut offset = 0u64;
        for chunk in data.chunks(self.config.chunk_size) {
            self.backend
                .upload_chunk(endpoint, offset, total, chunk)
                .await?;
            offset += chunk.len() as u64;
            on_progress(UploadProgress::BytesUploaded {
                sent: offset,
                total,
            });
            tracing::debug!(sent = offset, total, "Chunk acknowledged");
        }
        tracing::info!(bytes = total, "Resumable upload complete");
        Ok(())
    }

    /// Poll until a terminal status or the attempt bound.
    async fn poll(
        &self,
        ticket: &UploadTicket,
        on_progress: &impl Fn(UploadProgress),
    ) -> Result<String> {
        let mut processing_seen = false;

        for attempt in 1..=self.config.max_poll_attempts {
            match self.backend.asset_status(&ticket.asset_id).await {
                Ok(status) => {
                    on_progress(UploadProgress::StatusPolled {
                        attempt,
                        status: status.status,
                    });
                    match status.status {
                        ProcessingStatus::Queued => {}
                        ProcessingStatus::Processing => {
                            if !processing_seen {
                                processing_seen = true;
                                tracing::info!(
                                    asset_id = %ticket.asset_id,
                                    "Server began transcoding"
                                );
                                on_progress(UploadProgress::ProcessingStarted);
                            }
                        }
                        ProcessingStatus::Ready => {
                            self.set_phase(UploadPhase::Ready).await;
                            // Servers occasionally omit the playback id on
                            // the ready response; the asset id still plays.
                            let playback_id = status
                                .playback_id
                                .unwrap_or_else(|| ticket.asset_id.clone());
                            tracing::info!(
                                asset_id = %ticket.asset_id,
                                playback_id = %playback_id,
                                polls = attempt,
                                "Asset ready"
                            );
                            return Ok(playback_id);
                        }
                        ProcessingStatus::Failed => {
                            self.set_phase(UploadPhase::Failed).await;
                            let reason = status
                                .error
                                .unwrap_or_else(|| "no reason reported".to_string());
                            return Err(GenStreamError::ProcessingFailed(reason));
                        }
                    }
                }
                Err(e) => {
                    // A flaky poll is not terminal; it still consumes an attempt
                    tracing::warn!(attempt, error = %e, "Status poll failed");
                }
            }
            sleep(self.config.poll_interval).await;
        }

        self.set_phase(UploadPhase::TimedOut).await;
        Err(GenStreamError::ProcessingTimeout {
            attempts: self.config.max_poll_attempts,
        })
    }

    async fn set_phase(&self, phase: UploadPhase) {
        *self.phase.lock().await = phase;
    }
}
