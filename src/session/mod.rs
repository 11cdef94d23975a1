use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::{GenStreamError, Result};

/// Diffusion parameters pushed to the live session. The caller owns any
/// debouncing; every call here is one remote write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamParams {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub inference_steps: u32,
    /// How strongly the model reinterprets the input frame, 0.0..=1.0
    pub strength: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            negative_prompt: None,
            inference_steps: 50,
            strength: 0.65,
            seed: None,
        }
    }
}

/// A live generative stream session on the inference API.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSession {
    pub id: String,
    /// Publish endpoint for the offer/answer handshake
    pub whip_url: String,
    /// Where the processed output can be watched, once live
    #[serde(default)]
    pub output_playback_url: Option<String>,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    pipeline_id: &'a str,
    params: &'a StreamParams,
}

#[derive(Serialize)]
struct UpdateParamsRequest<'a> {
    params: &'a StreamParams,
}

/// Client for the Daydream-style real-time diffusion API.
pub struct StreamSessionClient {
    config: SessionConfig,
    client: reqwest::Client,
}

impl StreamSessionClient {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GenStreamError::internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub async fn create_session(&self, params: &StreamParams) -> Result<StreamSession> {
        let url = format!("{}/streams", self.config.api_url);
        let body = CreateSessionRequest {
            pipeline_id: &self.config.pipeline_id,
            params,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenStreamError::SessionRequest(format!("Create failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GenStreamError::SessionRequest(format!(
                "Create failed with status {}: {}",
                status, text
            )));
        }

        let session: StreamSession = response.json().await.map_err(|e| {
            GenStreamError::SessionRequest(format!("Failed to parse session: {}", e))
        })?;

        tracing::info!(
            session_id = %session.id,
            whip_url = %session.whip_url,
            "Created stream session"
        );
        Ok(session)
    }

    pub async fn update_params(&self, session_id: &str, params: &StreamParams) -> Result<()> {
        let url = format!(
            "{}/streams/{}",
            self.config.api_url,
            urlencoding::encode(session_id)
        );

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.config.api_key)
            .json(&UpdateParamsRequest { params })
            .send()
            .await
            .map_err(|e| GenStreamError::SessionRequest(format!("Param update failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GenStreamError::SessionRequest(format!(
                "Param update failed with status {}",
                response.status()
            )));
        }

        tracing::debug!(session_id = %session_id, "Pushed stream params");
        Ok(())
    }

    /// Best-effort: a session the API already reaped is not an error.
    pub async fn close_session(&self, session_id: &str) -> Result<()> {
        let url = format!(
            "{}/streams/{}",
            self.config.api_url,
            urlencoding::encode(session_id)
        );

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| GenStreamError::SessionRequest(format!("Close failed: {}", e)))?;

        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(GenStreamError::SessionRequest(format!(
                "Close failed with status {}",
                response.status()
            )));
        }
        tracing::info!(session_id = %session_id, "Closed stream session");
        Ok(())
    }
}
