use crate::config::StudioConfig;
use crate::error::{GenStreamError, Result};

use super::ticket::{AssetStatus, UploadTicket};

/// Backend collaborator surface consumed by the uploader.
///
/// The production implementation is [`StudioClient`]; tests script this
/// trait to drive the uploader deterministically.
#[async_trait::async_trait]
pub trait StudioBackend: Send + Sync {
    /// Request an upload ticket. One call, no retry at this layer.
    async fn request_upload(&self) -> Result<UploadTicket>;

    /// Deliver one chunk to the resumable endpoint at the given byte offset.
    async fn upload_chunk(
        &self,
        endpoint: &str,
        offset: u64,
        total: u64,
        chunk: &[u8],
    ) -> Result<()>;

    /// Single direct write of the whole artifact.
    async fn upload_direct(&self, url: &str, data: &[u8]) -> Result<()>;

    /// Poll processing status by asset id.
    async fn asset_status(&self, asset_id: &str) -> Result<AssetStatus>;
}

/// HTTP client for the Studio video hosting/transcoding API.
pub struct StudioClient {
    config: StudioConfig,
    client: reqwest::Client,
}

impl StudioClient {
    pub fn new(config: StudioConfig) -> Result<Self> {
        // No request timeout here: chunk-upload waits are bounded only by
        // transport defaults.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GenStreamError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl StudioBackend for StudioClient {
    async fn request_upload(&self) -> Result<UploadTicket> {
        let url = format!("{}/uploads", self.config.api_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({ "cors_origin": "*" }))
            .send()
            .await
            .map_err(|e| GenStreamError::TicketRequest(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenStreamError::TicketRequest(format!(
                "Ticket request failed with status {}: {}",
                status, body
            )));
        }

        let ticket: UploadTicket = response.json().await.map_err(|e| {
            GenStreamError::TicketRequest(format!("Failed to parse ticket: {}", e))
        })?;

        tracing::info!(
            asset_id = %ticket.asset_id,
            resumable = ticket.resumable_endpoint.is_some(),
            direct = ticket.upload_url.is_some(),
            "Received upload ticket"
        );
        Ok(ticket)
    }

    async fn upload_chunk(
        &self,
        endpoint: &str,
        offset: u64,
        total: u64,
        chunk: &[u8],
    ) -> Result<()> {
        let end = offset + chunk.len() as u64 - 1;

        let response = self
            .client
            .put(endpoint)
            .header("Content-Range", format!("bytes {}-{}/{}", offset, end, total))
            .body(chunk.to_vec())
            .send()
            .await
            .map_err(|e| GenStreamError::upload(format!("Chunk request failed: {}", e)))?;

        // 308 acknowledges an intermediate chunk; 200/201 the final one
        match response.status().as_u16() {
            200 | 201 | 308 => Ok(()),
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(GenStreamError::upload(format!(
                    "Chunk at offset {} rejected with status {}: {}",
                    offset, code, body
                )))
            }
        }
    }

    async fn upload_direct(&self, url: &str, data: &[u8]) -> Result<()> {
        let response = self
            .client
            .put(url)
            .header("Content-Type", "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| GenStreamError::upload(format!("Direct write failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenStreamError::upload(format!(
                "Direct write rejected with status {}: {}",
                status, body
            )));
        }
        Ok(())
    }

    async fn asset_status(&self, asset_id: &str) -> Result<AssetStatus> {
        let url = format!(
            "{}/assets/{}",
            self.config.api_url,
            urlencoding::encode(asset_id)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| GenStreamError::upload(format!("Status poll failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GenStreamError::upload(format!(
                "Status poll failed with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GenStreamError::upload(format!("Failed to parse asset status: {}", e)))
    }
}
