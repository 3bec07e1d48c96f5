use anyhow::Result;
use clap::Parser;
use meetscribe::audio::AudioSource;
use meetscribe::recognize::{default_loader, Recognizer};
use meetscribe::session::{SessionConfig, TranscriptionSession};
use meetscribe::store::{StorageHealth, TranscriptionStore};
use meetscribe::summary::{GeminiGenerator, SummaryClient};
use meetscribe::{create_router, AppState, Config};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "meetscribe")]
#[command(about = "Meeting transcription service with local persistence")]
struct Args {
    /// Path to the config file (without extension)
    #[arg(short, long, default_value = "config/meetscribe")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    // Open the store; this degrades to memory-only rather than failing
    let store = Arc::new(TranscriptionStore::open(&cfg.storage.path).await);
    if store.health().await == StorageHealth::MemoryOnly {
        warn!("Running without persistence, saved meetings will be lost on exit");
    }

    // Recognition front end
    let loader = default_loader(
        Path::new(&cfg.recognition.cache_dir),
        &cfg.recognition.artifact_base_url,
    );
    let recognizer = Arc::new(Recognizer::new(loader));

    if cfg.recognition.preload {
        if let Err(e) = recognizer.ensure_loaded(cfg.recognition.tier).await {
            warn!(
                "Model preload failed, recording is blocked until a load succeeds: {}",
                e
            );
        }
    }

    // Summary generation
    let generator = Arc::new(GeminiGenerator::new(
        cfg.summary.api_base,
        cfg.summary.model,
        cfg.summary.api_key_env,
    ));
    let summary = Arc::new(SummaryClient::new(generator));

    // The transcription session
    let session_config = SessionConfig {
        chunk_interval: Duration::from_millis(cfg.audio.chunk_interval_ms),
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        tier: cfg.recognition.tier,
        ..SessionConfig::default()
    };
    let source = AudioSource::parse(&cfg.audio.source);
    let session = Arc::new(TranscriptionSession::new(
        session_config,
        source,
        Arc::clone(&recognizer),
        Arc::clone(&store),
    ));

    let state = AppState::new(session, store, recognizer, summary);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
