// Uploader behavior against a scripted backend: transfer fallback, the
// intermediate "server began transcoding" signal, and terminal outcomes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use genstream::config::UploadConfig;
use genstream::error::{GenStreamError, Result};
use genstream::recording::{RecordedArtifact, FORMAT_PREFERENCES};
use genstream::upload::{
    AssetStatus, ProcessingStatus, StudioBackend, UploadPhase, UploadProgress, UploadTicket,
    Uploader,
};

struct ScriptedBackend {
    fail_ticket: bool,
    offer_resumable: bool,
    offer_direct: bool,
    fail_chunks: bool,
    fail_direct: bool,
    /// Drained per poll; the last entry repeats once the script runs out
    statuses: Mutex<VecDeque<AssetStatus>>,
    polls: AtomicU32,
    chunk_offsets: Mutex<Vec<u64>>,
    direct_writes: AtomicU32,
}

impl ScriptedBackend {
    fn new(statuses: Vec<AssetStatus>) -> Self {
        Self {
            fail_ticket: false,
            offer_resumable: true,
            offer_direct: true,
            fail_chunks: false,
            fail_direct: false,
            statuses: Mutex::new(statuses.into()),
            polls: AtomicU32::new(0),
            chunk_offsets: Mutex::new(Vec::new()),
            direct_writes: AtomicU32::new(0),
        }
    }
}

fn status(s: ProcessingStatus) -> AssetStatus {
    AssetStatus {
        status: s,
        progress: None,
        playback_id: None,
        error: None,
    }
}

fn ready(playback_id: &str) -> AssetStatus {
    AssetStatus {
        status: ProcessingStatus::Ready,
        progress: Some(1.0),
        playback_id: Some(playback_id.to_string()),
        error: None,
    }
}

#[async_trait::async_trait]
impl StudioBackend for ScriptedBackend {
    async fn request_upload(&self) -> Result<UploadTicket> {
        if self.fail_ticket {
            return Err(GenStreamError::TicketRequest("quota exceeded".into()));
        }
        Ok(UploadTicket {
            asset_id: "asset_1".to_string(),
            upload_url: self
                .offer_direct
                .then(|| "https://store.test/direct/asset_1".to_string()),
            resumable_endpoint: self
                .offer_resumable
                .then(|| "https://store.test/resumable/asset_1".to_string()),
        })
    }

    async fn upload_chunk(
        &self,
        _endpoint: &str,
        offset: u64,
        _total: u64,
        _chunk: &[u8],
    ) -> Result<()> {
        if self.fail_chunks {
            return Err(GenStreamError::upload("connection reset"));
        }
        self.chunk_offsets.lock().unwrap().push(offset);
        Ok(())
    }

    async fn upload_direct(&self, _url: &str, _data: &[u8]) -> Result<()> {
        if self.fail_direct {
            return Err(GenStreamError::upload("service unavailable"));
        }
        self.direct_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn asset_status(&self, _asset_id: &str) -> Result<AssetStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap())
        } else {
            Ok(statuses.front().cloned().unwrap())
        }
    }
}

fn artifact(bytes: usize) -> RecordedArtifact {
    RecordedArtifact {
        data: vec![0x5A; bytes],
        duration: Duration::from_secs(3),
        format: FORMAT_PREFERENCES[0].clone(),
    }
}

fn fast_config(max_poll_attempts: u32) -> UploadConfig {
    UploadConfig {
        chunk_size: 1000,
        poll_interval: Duration::from_millis(1),
        max_poll_attempts,
    }
}

#[tokio::test]
async fn scripted_happy_path_fires_processing_started_once() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        status(ProcessingStatus::Queued),
        status(ProcessingStatus::Processing),
        status(ProcessingStatus::Processing),
        ready("pb_final"),
    ]));
    let uploader = Uploader::new(backend.clone(), fast_config(300));
    let events = Mutex::new(Vec::new());

    let playback_id = uploader
        .upload(&artifact(2500), |p| events.lock().unwrap().push(p))
        .await
        .unwrap();

    assert_eq!(playback_id, "pb_final");
    assert_eq!(uploader.phase().await, UploadPhase::Ready);
    assert_eq!(backend.polls.load(Ordering::SeqCst), 4);

    let events = events.into_inner().unwrap();
    let started = events
        .iter()
        .filter(|e| matches!(e, UploadProgress::ProcessingStarted))
        .count();
    assert_eq!(started, 1, "intermediate completion must fire exactly once");

    // It fires at the first observed `processing`, before the second poll of
    // the same status
    let first_processing_poll = events
        .iter()
        .position(|e| {
            matches!(
                e,
                UploadProgress::StatusPolled {
                    status: ProcessingStatus::Processing,
                    ..
                }
            )
        })
        .unwrap();
    let started_pos = events
        .iter()
        .position(|e| matches!(e, UploadProgress::ProcessingStarted))
        .unwrap();
    assert_eq!(started_pos, first_processing_poll + 1);
}

#[tokio::test]
async fn chunked_transfer_reports_byte_progress() {
    let backend = Arc::new(ScriptedBackend::new(vec![ready("pb")]));
    let uploader = Uploader::new(backend.clone(), fast_config(300));
    let events = Mutex::new(Vec::new());

    uploader
        .upload(&artifact(2500), |p| events.lock().unwrap().push(p))
        .await
        .unwrap();

    // 2500 bytes at 1000-byte chunks: offsets 0, 1000, 2000
    assert_eq!(*backend.chunk_offsets.lock().unwrap(), vec![0, 1000, 2000]);
    assert_eq!(backend.direct_writes.load(Ordering::SeqCst), 0);

    let progress: Vec<(u64, u64)> = events
        .into_inner()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            UploadProgress::BytesUploaded { sent, total } => Some((*sent, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1000, 2500), (2000, 2500), (2500, 2500)]);
}

#[tokio::test]
async fn resumable_failure_falls_back_to_direct_write() {
    let mut backend = ScriptedBackend::new(vec![ready("pb")]);
    backend.fail_chunks = true;
    let backend = Arc::new(backend);
    let uploader = Uploader::new(backend.clone(), fast_config(300));

    let playback_id = uploader.upload(&artifact(2500), |_| {}).await.unwrap();

    assert_eq!(playback_id, "pb");
    assert_eq!(backend.direct_writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn both_transfer_paths_failing_is_upload_error() {
    let mut backend = ScriptedBackend::new(vec![ready("pb")]);
    backend.fail_chunks = true;
    backend.fail_direct = true;
    let backend = Arc::new(backend);
    let uploader = Uploader::new(backend.clone(), fast_config(300));

    let err = uploader.upload(&artifact(2500), |_| {}).await.unwrap_err();

    assert!(matches!(err, GenStreamError::Upload(_)));
    assert_eq!(uploader.phase().await, UploadPhase::Failed);
    assert_eq!(backend.polls.load(Ordering::SeqCst), 0, "no polling after failed transfer");
}

#[tokio::test]
async fn ticket_without_endpoints_is_upload_error() {
    let mut backend = ScriptedBackend::new(vec![ready("pb")]);
    backend.offer_resumable = false;
    backend.offer_direct = false;
    let uploader = Uploader::new(Arc::new(backend), fast_config(300));

    let err = uploader.upload(&artifact(2500), |_| {}).await.unwrap_err();
    assert!(matches!(err, GenStreamError::Upload(_)));
}

#[tokio::test]
async fn ticket_failure_propagates_without_transfer() {
    let mut backend = ScriptedBackend::new(vec![ready("pb")]);
    backend.fail_ticket = true;
    let backend = Arc::new(backend);
    let uploader = Uploader::new(backend.clone(), fast_config(300));

    let err = uploader.upload(&artifact(2500), |_| {}).await.unwrap_err();

    assert!(matches!(err, GenStreamError::TicketRequest(_)));
    assert!(backend.chunk_offsets.lock().unwrap().is_empty());
    assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn never_terminal_times_out_and_stops_polling() {
    let backend = Arc::new(ScriptedBackend::new(vec![status(ProcessingStatus::Queued)]));
    let uploader = Uploader::new(backend.clone(), fast_config(25));

    let err = uploader.upload(&artifact(2500), |_| {}).await.unwrap_err();

    assert!(matches!(
        err,
        GenStreamError::ProcessingTimeout { attempts: 25 }
    ));
    assert_eq!(uploader.phase().await, UploadPhase::TimedOut);

    let polls_at_timeout = backend.polls.load(Ordering::SeqCst);
    assert_eq!(polls_at_timeout, 25);

    // No stray polls after rejection
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(backend.polls.load(Ordering::SeqCst), polls_at_timeout);
}

#[tokio::test]
async fn failed_status_rejects_immediately_with_reason() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        status(ProcessingStatus::Queued),
        AssetStatus {
            status: ProcessingStatus::Failed,
            progress: None,
            playback_id: None,
            error: Some("input container corrupt".to_string()),
        },
        status(ProcessingStatus::Queued),
    ]));
    let uploader = Uploader::new(backend.clone(), fast_config(300));

    let err = uploader.upload(&artifact(2500), |_| {}).await.unwrap_err();

    match err {
        GenStreamError::ProcessingFailed(reason) => {
            assert_eq!(reason, "input container corrupt")
        }
        other => panic!("expected ProcessingFailed, got {:?}", other),
    }
    assert_eq!(
        backend.polls.load(Ordering::SeqCst),
        2,
        "remaining polls must not run after a terminal failure"
    );
    assert_eq!(uploader.phase().await, UploadPhase::Failed);
}

#[tokio::test]
async fn ready_without_playback_id_falls_back_to_asset_id() {
    let backend = Arc::new(ScriptedBackend::new(vec![status(ProcessingStatus::Ready)]));
    let uploader = Uploader::new(backend, fast_config(300));

    let playback_id = uploader.upload(&artifact(2500), |_| {}).await.unwrap();
    assert_eq!(playback_id, "asset_1");
}

#[tokio::test]
async fn uploader_is_single_use() {
    let backend = Arc::new(ScriptedBackend::new(vec![ready("pb")]));
    let uploader = Uploader::new(backend, fast_config(300));

    uploader.upload(&artifact(2500), |_| {}).await.unwrap();
    let err = uploader.upload(&artifact(2500), |_| {}).await.unwrap_err();
    assert!(matches!(err, GenStreamError::Internal(_)));
}
