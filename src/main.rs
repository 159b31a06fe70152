use anyhow::Result;
use clap::Parser;
use medscribe::{Config, FsBlobStore};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "medscribe", about = "Clinician-patient conversation recorder")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/medscribe")]
    config: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("medscribe v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "HTTP server will bind to {}:{}",
        cfg.service.http.bind, cfg.service.http.port
    );
    info!(
        "Audio: {}Hz, {} channel(s)",
        cfg.audio.sample_rate, cfg.audio.channels
    );
    info!(
        "Voiceprint group: {} (threshold {:.2})",
        cfg.voiceprint.group_id, cfg.voiceprint.threshold
    );

    // Validate the blob storage directory up front
    let _store = FsBlobStore::new(&cfg.storage.data_dir)?;
    info!("Blob storage ready at {}", cfg.storage.data_dir);

    info!("Vendor capture/transcription/voiceprint clients are wired by the embedding application");

    Ok(())
}
