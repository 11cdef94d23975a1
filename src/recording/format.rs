use serde::Serialize;

/// A negotiated recording format: container plus optional codec pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingFormat {
    /// Full MIME type, e.g. `video/webm;codecs=vp9,opus`
    pub mime_type: &'static str,
    /// File extension for the container
    pub extension: &'static str,
    /// Whether the container is WebM (eligible for duration repair)
    pub webm: bool,
}

impl RecordingFormat {
    const fn webm(mime_type: &'static str) -> Self {
        Self {
            mime_type,
            extension: "webm",
            webm: true,
        }
    }
}

/// Ordered preference list: higher-fidelity codec pairs first, falling back
/// to baseline container-only encoding.
pub const FORMAT_PREFERENCES: [RecordingFormat; 4] = [
    RecordingFormat::webm("video/webm;codecs=vp9,opus"),
    RecordingFormat::webm("video/webm;codecs=vp8,opus"),
    RecordingFormat::webm("video/webm;codecs=h264"),
    RecordingFormat::webm("video/webm"),
];

impl std::fmt::Display for RecordingFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mime_type)
    }
}
