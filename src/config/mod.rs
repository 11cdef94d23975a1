use std::env;
use std::time::Duration;

pub struct Config {
    pub session: SessionConfig,
    pub studio: StudioConfig,
    pub recording: RecordingConfig,
    pub upload: UploadConfig,
}

/// Daydream-style generative stream API
pub struct SessionConfig {
    pub api_url: String,
    pub api_key: String,
    pub pipeline_id: String,
}

/// Studio-style video hosting/transcoding API
pub struct StudioConfig {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Interval between fragment emissions. Shorter intervals risk
    /// malformed fragments from the encoder.
    pub fragment_interval: Duration,
    /// How long to wait for the encoder to confirm its final flush.
    pub stop_timeout: Duration,
    /// Artifacts below this size are treated as corrupt.
    pub min_artifact_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub chunk_size: usize,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            fragment_interval: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(5),
            min_artifact_bytes: 1000,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8 * 1024 * 1024,
            poll_interval: Duration::from_secs(1),
            // 300 polls at 1s = 5 minutes before giving up on transcoding
            max_poll_attempts: 300,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            session: SessionConfig {
                api_url: env::var("DAYDREAM_API_URL")
                    .unwrap_or_else(|_| "https://api.daydream.live/v1".to_string()),
                api_key: env::var("DAYDREAM_API_KEY").unwrap_or_default(),
                pipeline_id: env::var("DAYDREAM_PIPELINE_ID").unwrap_or_default(),
            },
            studio: StudioConfig {
                api_url: env::var("STUDIO_API_URL")
                    .unwrap_or_else(|_| "https://api.studio.example.com/v1".to_string()),
                api_key: env::var("STUDIO_API_KEY").unwrap_or_default(),
            },
            recording: RecordingConfig {
                fragment_interval: Duration::from_millis(
                    env_u64("RECORDING_FRAGMENT_INTERVAL_MS", 1000),
                ),
                stop_timeout: Duration::from_millis(env_u64("RECORDING_STOP_TIMEOUT_MS", 5000)),
                min_artifact_bytes: env_u64("RECORDING_MIN_ARTIFACT_BYTES", 1000) as usize,
            },
            upload: UploadConfig {
                chunk_size: env_u64("UPLOAD_CHUNK_SIZE", 8 * 1024 * 1024) as usize,
                poll_interval: Duration::from_millis(env_u64("UPLOAD_POLL_INTERVAL_MS", 1000)),
                max_poll_attempts: env_u64("UPLOAD_MAX_POLL_ATTEMPTS", 300) as u32,
            },
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_defaults() {
        let config = RecordingConfig::default();
        assert_eq!(config.fragment_interval, Duration::from_secs(1));
        assert_eq!(config.stop_timeout, Duration::from_secs(5));
        assert_eq!(config.min_artifact_bytes, 1000);
    }

    #[test]
    fn test_upload_defaults() {
        let config = UploadConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.max_poll_attempts, 300);
        assert_eq!(config.chunk_size, 8 * 1024 * 1024);
    }

    #[test]
    fn test_env_u64_falls_back_on_garbage() {
        std::env::set_var("GENSTREAM_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_u64("GENSTREAM_TEST_GARBAGE", 42), 42);
        std::env::remove_var("GENSTREAM_TEST_GARBAGE");
    }
}
