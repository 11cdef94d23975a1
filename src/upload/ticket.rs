use serde::{Deserialize, Serialize};

/// Server-issued permission to upload one artifact. Consumed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTicket {
    pub asset_id: String,
    /// Direct-write endpoint, if offered
    #[serde(default)]
    pub upload_url: Option<String>,
    /// Resumable chunked-upload endpoint, if offered
    #[serde(default)]
    pub resumable_endpoint: Option<String>,
}

/// Remote-side processing state, polled by asset id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Queued,
    Processing,
    Ready,
    Failed,
}

impl ProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetStatus {
    pub status: ProcessingStatus,
    /// Server-side transcoding progress, 0.0..=1.0 when reported
    #[serde(default)]
    pub progress: Option<f32>,
    #[serde(default)]
    pub playback_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_deserialize_minimal() {
        let json = r#"{"asset_id": "asset_42"}"#;
        let ticket: UploadTicket = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.asset_id, "asset_42");
        assert!(ticket.upload_url.is_none());
        assert!(ticket.resumable_endpoint.is_none());
    }

    #[test]
    fn test_status_deserialize() {
        let json = r#"{
            "status": "ready",
            "progress": 1.0,
            "playback_id": "pb_123"
        }"#;
        let status: AssetStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.status, ProcessingStatus::Ready);
        assert_eq!(status.playback_id.as_deref(), Some("pb_123"));
        assert!(status.error.is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ProcessingStatus::Ready.is_terminal());
        assert!(ProcessingStatus::Failed.is_terminal());
        assert!(!ProcessingStatus::Queued.is_terminal());
        assert!(!ProcessingStatus::Processing.is_terminal());
    }

    #[test]
    fn test_status_wire_casing() {
        assert_eq!(
            serde_json::to_string(&ProcessingStatus::Processing).unwrap(),
            "\"processing\""
        );
    }
}
