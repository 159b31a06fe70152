//! Streaming transcription capability
//!
//! The concrete speech-to-text vendor lives outside this crate; the
//! recording controller only depends on these traits. A provider opens one
//! streaming session per recording, accepts captured audio chunks, and
//! yields interim and final results over a channel.

use tokio::sync::mpsc;

use crate::audio::AudioChunk;
use crate::error::Result;

/// A transcription result event.
#[derive(Debug, Clone)]
pub enum TranscriptEvent {
    /// Unfinalized text for live display. Never committed to the ledger.
    Interim { text: String, start_ms: u64 },

    /// A finalized speech segment. Offsets are milliseconds relative to
    /// the start of the recording.
    Final {
        text: String,
        confidence: Option<f32>,
        start_ms: u64,
        end_ms: u64,
    },
}

#[async_trait::async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Open a streaming transcription session.
    async fn open(&self, sample_rate: u32) -> Result<Box<dyn TranscriptionSession>>;
}

/// One streaming session, live for the duration of a recording.
#[async_trait::async_trait]
pub trait TranscriptionSession: Send {
    /// Forward one chunk of captured audio to the provider.
    async fn send(&mut self, chunk: &AudioChunk) -> Result<()>;

    /// Take the event receiver. Yields results until the session finishes;
    /// returns `None` if already taken.
    fn take_events(&mut self) -> Option<mpsc::Receiver<TranscriptEvent>>;

    /// Signal end of audio. The provider flushes pending results and then
    /// closes the event channel.
    async fn finish(&mut self) -> Result<()>;
}
