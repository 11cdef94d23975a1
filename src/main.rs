use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::*;
use rand::Rng;

use genstream::capture::FileSurface;
use genstream::config::{Config, StudioConfig, UploadConfig};
use genstream::error::{GenStreamError, Result};
use genstream::publish::{TransportPublisher, WebRtcConfig};
use genstream::recording::{RecordedArtifact, Recorder, FORMAT_PREFERENCES};
use genstream::session::{StreamParams, StreamSessionClient};
use genstream::upload::{StudioClient, UploadProgress, Uploader};

#[derive(Parser)]
#[command(name = "genstream")]
#[command(about = "Camera-to-generative-stream capture, recording and upload", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: session, publish, record, upload
    Run {
        /// Pre-encoded WebM used as the capture surface
        #[arg(short, long)]
        input: PathBuf,

        /// How long to record before stopping
        #[arg(short, long, default_value_t = 10)]
        duration_secs: u64,

        /// Diffusion prompt for the stream session
        #[arg(short, long, default_value = "dreamlike watercolor")]
        prompt: String,

        /// Skip session creation and publishing, record and upload only
        #[arg(long)]
        offline: bool,

        /// Also write the finalized artifact to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload an existing recording and wait for processing
    Upload {
        /// Path to the recording
        file: PathBuf,
    },

    /// Push new diffusion parameters to a live session
    SetParams {
        /// Session to update
        #[arg(short, long)]
        session_id: String,

        #[arg(short, long)]
        prompt: String,

        #[arg(long, default_value_t = 0.65)]
        strength: f32,

        #[arg(long, default_value_t = 50)]
        steps: u32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genstream=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let outcome = match cli.command {
        Commands::Run {
            input,
            duration_secs,
            prompt,
            offline,
            output,
        } => run_pipeline(config, input, duration_secs, prompt, offline, output).await,
        Commands::Upload { file } => upload_file(config, file).await,
        Commands::SetParams {
            session_id,
            prompt,
            strength,
            steps,
        } => set_params(config, session_id, prompt, strength, steps).await,
    };

    if let Err(e) = outcome {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_pipeline(
    config: Config,
    input: PathBuf,
    duration_secs: u64,
    prompt: String,
    offline: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let run_id: u32 = rand::thread_rng().gen_range(100_000..999_999);
    println!("{} run {}", "▶".cyan(), run_id.to_string().bold());

    let mut live = None;
    if !offline {
        let client = StreamSessionClient::new(config.session)?;
        let params = StreamParams {
            prompt,
            ..Default::default()
        };
        let session = client.create_session(&params).await?;
        println!("  session {}", session.id.as_str().green());

        let publisher = TransportPublisher::connect(
            &WebRtcConfig::default(),
            &session.whip_url,
            None,
            vec![],
        )
        .await?;
        println!("  {}", "publishing".green());
        live = Some((client, session, publisher));
    }

    let surface = Arc::new(FileSurface::new(&input));
    let recorder = Recorder::new(surface, config.recording);

    recorder.start().await?;
    println!("  recording for {}s...", duration_secs);
    tokio::time::sleep(Duration::from_secs(duration_secs)).await;
    let artifact = recorder.stop().await?;
    println!(
        "  captured {} bytes ({:.1}s, {})",
        artifact.len().to_string().bold(),
        artifact.duration.as_secs_f64(),
        artifact.format
    );

    if let Some(path) = &output {
        artifact.write_to(path).await?;
        println!("  saved copy to {}", path.display());
    }

    if let Some((client, session, publisher)) = live {
        publisher.close().await;
        if let Err(e) = client.close_session(&session.id).await {
            tracing::warn!(error = %e, "Session close failed");
        }
    }

    let playback_id = upload_artifact(config.studio, config.upload, &artifact).await?;
    println!("{} playback id: {}", "✔".green(), playback_id.bold());
    Ok(())
}

async fn upload_file(config: Config, file: PathBuf) -> Result<()> {
    let data = tokio::fs::read(&file).await.map_err(|e| {
        GenStreamError::internal(format!("Failed to read {}: {}", file.display(), e))
    })?;
    let artifact = RecordedArtifact {
        data,
        duration: Duration::ZERO,
        // Container-only baseline: nothing is known about the codecs
        format: FORMAT_PREFERENCES[FORMAT_PREFERENCES.len() - 1].clone(),
    };

    let playback_id = upload_artifact(config.studio, config.upload, &artifact).await?;
    println!("{} playback id: {}", "✔".green(), playback_id.bold());
    Ok(())
}

async fn upload_artifact(
    studio: StudioConfig,
    upload_config: UploadConfig,
    artifact: &RecordedArtifact,
) -> Result<String> {
    let backend = Arc::new(StudioClient::new(studio)?);
    let uploader = Uploader::new(backend, upload_config);

    uploader
        .upload(artifact, |progress| match progress {
            UploadProgress::BytesUploaded { sent, total } => {
                let pct = if total > 0 { sent * 100 / total } else { 100 };
                println!("  uploading {}%", pct);
            }
            UploadProgress::ProcessingStarted => {
                println!("  {}", "transcoding started".yellow());
            }
            UploadProgress::StatusPolled { .. } => {}
        })
        .await
}

async fn set_params(
    config: Config,
    session_id: String,
    prompt: String,
    strength: f32,
    steps: u32,
) -> Result<()> {
    let client = StreamSessionClient::new(config.session)?;
    let params = StreamParams {
        prompt,
        strength,
        inference_steps: steps,
        ..Default::default()
    };
    client.update_params(&session_id, &params).await?;
    println!("{} params updated", "✔".green());
    Ok(())
}
