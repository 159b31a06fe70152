use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub recording: RecordingSettings,
    pub voiceprint: VoiceprintConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Deserialize)]
pub struct RecordingSettings {
    pub segment_padding_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub drain_grace_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct VoiceprintConfig {
    pub group_id: String,
    /// Identification matches below this confidence count as no-match
    pub threshold: f32,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl From<&Config> for crate::recording::RecordingConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            segment_padding_ms: cfg.recording.segment_padding_ms,
            max_retries: cfg.recording.max_retries,
            retry_backoff_ms: cfg.recording.retry_backoff_ms,
            drain_grace_ms: cfg.recording.drain_grace_ms,
            voiceprint_group_id: cfg.voiceprint.group_id.clone(),
        }
    }
}
