use crate::error::Result;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since recording started
    pub timestamp_ms: u64,
}

impl AudioChunk {
    /// Duration of this chunk in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Audio capture capability
///
/// Implemented by collaborators that own a concrete input device (ALSA,
/// file playback, a test script). A capture produces a finite-while-active
/// sequence of chunks; closing the channel signals end of stream.
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio chunks. The
    /// channel is closed once capture stops or the underlying source ends.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>>;

    /// Stop capturing audio and close the chunk channel
    async fn stop(&mut self) -> Result<()>;

    /// Check if capture is currently active
    fn is_capturing(&self) -> bool;

    /// Sample rate the capture produces, in Hz
    fn sample_rate(&self) -> u32;

    /// Get capture name for logging
    fn name(&self) -> &str;
}

/// Creates one capture instance per recording session.
pub trait CaptureFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn AudioCapture>>;
}
