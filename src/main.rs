use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use segcap::{
    Config, DeviceConfig, NatsSink, SegmentSink, SessionConfig, SessionController,
    WavFileFactory, WavSink, AUDIO_PERMISSION_REQUEST,
};

/// Replay a WAV file through the capture pipeline, rotating segments on the
/// configured threshold and emitting them to a sink.
#[derive(Parser, Debug)]
#[command(name = "segcap", version, about = "Audio capture and segmentation demo")]
struct Cli {
    /// WAV file to use as the capture source
    input: String,

    /// Config file (without extension)
    #[arg(long, default_value = "config/segcap")]
    config: String,

    /// Publish segments to this NATS server instead of writing WAV files
    #[arg(long)]
    nats_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} starting", cfg.service.name);

    let session = SessionConfig {
        segment_duration: Duration::from_secs(cfg.audio.segment_duration_secs),
        device: DeviceConfig {
            sample_rate: cfg.audio.sample_rate,
            channels: cfg.audio.channels,
            frame_duration_ms: cfg.audio.frame_duration_ms,
        },
        ..SessionConfig::default()
    };

    let mut nats_sink: Option<Arc<NatsSink>> = None;
    let sink: Arc<dyn SegmentSink> = match cli.nats_url.or_else(|| cfg.sink.nats_url.clone()) {
        Some(url) => {
            let sink = Arc::new(NatsSink::connect(&url, session.session_id.clone()).await?);
            nats_sink = Some(Arc::clone(&sink));
            sink
        }
        None => Arc::new(WavSink::new(
            session.session_id.clone(),
            &cfg.sink.segments_path,
        )?),
    };

    let session_id = session.session_id.clone();
    let factory = Box::new(WavFileFactory::new(&cli.input, &session.device));
    let controller = SessionController::new(session, factory, sink);

    // Drive the host lifecycle; the demo host already holds capture permission.
    controller.attach();
    controller.on_permission_result(AUDIO_PERMISSION_REQUEST, true);
    controller.on_foreground();

    // Wait for the file device to reach end of stream.
    while controller.is_recording() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    controller.on_background();
    controller.detach();

    // Flush queued segments and the end-of-session marker before the
    // runtime shuts down.
    if let Some(nats) = nats_sink {
        nats.close().await?;
    }

    let stats = controller.stats();
    info!(
        "Session {} complete: {} segments emitted in {:.1}s",
        session_id, stats.segments_emitted, stats.duration_secs
    );

    Ok(())
}
