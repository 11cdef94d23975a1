// End-to-end recorder run over real WebM bytes: file replay surface in,
// finalized artifact with a patched container duration out.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use genstream::capture::FileSurface;
use genstream::config::RecordingConfig;
use genstream::recording::{webm, Recorder, RecordingState};

fn vint_size(value: u64, width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width];
    for (i, b) in out.iter_mut().enumerate() {
        *b = (value >> (8 * (width - 1 - i))) as u8;
    }
    out[0] |= 1 << (8 - width);
    out
}

/// A stream-shaped WebM without a Duration element, padded with cluster
/// payload so it clears the minimum artifact size.
fn build_streamed_webm(cluster_payload: usize) -> Vec<u8> {
    let mut out = Vec::new();

    // EBML header, empty payload
    out.extend_from_slice(&[0x1A, 0x45, 0xDF, 0xA3]);
    out.extend_from_slice(&vint_size(0, 1));

    // Segment, unknown size
    out.extend_from_slice(&[0x18, 0x53, 0x80, 0x67]);
    out.push(0xFF);

    // Info holding only the default TimecodeScale
    let mut info = Vec::new();
    info.extend_from_slice(&[0x2A, 0xD7, 0xB1]);
    info.extend_from_slice(&vint_size(3, 1));
    info.extend_from_slice(&[0x0F, 0x42, 0x40]);
    out.extend_from_slice(&[0x15, 0x49, 0xA9, 0x66]);
    out.extend_from_slice(&vint_size(info.len() as u64, 1));
    out.extend_from_slice(&info);

    // One Cluster; its payload is opaque to the repair pass
    out.extend_from_slice(&[0x1F, 0x43, 0xB6, 0x75]);
    out.extend_from_slice(&vint_size(cluster_payload as u64, 2));
    out.extend(std::iter::repeat(0u8).take(cluster_payload));

    out
}

fn fast_config() -> RecordingConfig {
    RecordingConfig {
        fragment_interval: Duration::from_millis(1),
        stop_timeout: Duration::from_millis(200),
        min_artifact_bytes: 1000,
    }
}

#[tokio::test]
async fn file_replay_produces_repaired_artifact() {
    let source = build_streamed_webm(4000);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&source).unwrap();

    let surface = Arc::new(FileSurface::new(file.path()).with_chunk_bytes(512));
    let recorder = Recorder::new(surface, fast_config());

    assert!(webm::read_duration_ms(&source).is_none());

    recorder.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    let artifact = recorder.stop().await.unwrap();

    // Concatenation plus the 11-byte Duration element the repair inserted
    assert_eq!(artifact.len(), source.len() + 11);
    assert_eq!(recorder.state().await, RecordingState::Stopped);

    let repaired_ms = webm::read_duration_ms(&artifact.data).unwrap();
    let measured_ms = artifact.duration.as_secs_f64() * 1000.0;
    assert!(
        (repaired_ms - measured_ms).abs() < 1.0,
        "container says {} ms, measured {} ms",
        repaired_ms,
        measured_ms
    );
}

#[tokio::test]
async fn short_replay_is_rejected_as_undersized() {
    // Under the 1000-byte floor even after concatenation
    let source = build_streamed_webm(100);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&source).unwrap();

    let surface = Arc::new(FileSurface::new(file.path()));
    let recorder = Recorder::new(surface, fast_config());

    recorder.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let err = recorder.stop().await.unwrap_err();

    assert!(matches!(
        err,
        genstream::GenStreamError::UndersizedRecording { .. }
    ));
}
