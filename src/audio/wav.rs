use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hound::WavReader;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::capture::{AudioCapture, AudioChunk, CaptureFactory};
use crate::error::{Error, Result};

/// Encode 16-bit PCM samples as an in-memory WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::storage(format!("Failed to create WAV writer: {e}")))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::storage(format!("Failed to write sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| Error::storage(format!("Failed to finalize WAV data: {e}")))?;
    }

    Ok(cursor.into_inner())
}

/// File-backed audio capture
///
/// Streams a WAV file as fixed-duration chunks, for batch processing and
/// testing. Chunk timestamps are relative to the start of the file.
pub struct WavFileCapture {
    path: PathBuf,
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    chunk_duration_ms: u64,
    capturing: Arc<AtomicBool>,
}

impl WavFileCapture {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .map_err(|e| Error::provider_fatal(format!("Failed to open WAV file: {e}")))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::provider_fatal(format!("Failed to read audio samples: {e}")))?;

        debug!(
            "Audio file loaded: {}Hz, {} channels, {} samples",
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            chunk_duration_ms: 100,
            capturing: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[async_trait::async_trait]
impl AudioCapture for WavFileCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>> {
        debug!(
            "Streaming {} as {}ms chunks",
            self.path.display(),
            self.chunk_duration_ms
        );

        let (tx, rx) = mpsc::channel(64);

        let samples = self.samples.clone();
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let chunk_duration_ms = self.chunk_duration_ms;
        let capturing = Arc::clone(&self.capturing);

        capturing.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let samples_per_chunk =
                (sample_rate as u64 * chunk_duration_ms / 1000) as usize * channels as usize;

            let mut timestamp_ms = 0u64;
            for window in samples.chunks(samples_per_chunk.max(1)) {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }

                let chunk = AudioChunk {
                    samples: window.to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms,
                };
                timestamp_ms += chunk.duration_ms();

                if tx.send(chunk).await.is_err() {
                    break;
                }
            }

            capturing.store(false, Ordering::SeqCst);
            // tx dropped here closes the chunk channel
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

/// Factory producing one [`WavFileCapture`] per recording.
pub struct WavFileCaptureFactory {
    path: PathBuf,
}

impl WavFileCaptureFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CaptureFactory for WavFileCaptureFactory {
    fn open(&self) -> Result<Box<dyn AudioCapture>> {
        Ok(Box::new(WavFileCapture::open(&self.path)?))
    }
}
