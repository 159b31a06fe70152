use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audio::{encode_wav, AudioCapture, AudioChunk, CaptureFactory};
use crate::error::{Error, Result};
use crate::repos::SessionRepository;
use crate::session::{DraftUtterance, Speaker, UtteranceLedger};
use crate::storage::BlobStore;
use crate::transcription::{TranscriptEvent, TranscriptionProvider, TranscriptionSession};
use crate::voiceprint::VoiceprintRegistry;

/// Recording controller configuration.
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Audio padding around utterance offsets before identification
    pub segment_padding_ms: u64,
    /// Bounded retries for transient provider failures
    pub max_retries: u32,
    /// Base backoff between retries, scaled linearly per attempt
    pub retry_backoff_ms: u64,
    /// Grace period for in-flight finalization when a recording ends
    pub drain_grace_ms: u64,
    /// Voiceprint group consulted for speaker identification
    pub voiceprint_group_id: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            segment_padding_ms: 1000,
            max_retries: 3,
            retry_backoff_ms: 200,
            drain_grace_ms: 5000,
            voiceprint_group_id: "default".to_string(),
        }
    }
}

/// Unfinalized transcription text surfaced to the caller for live display.
#[derive(Debug, Clone, Serialize)]
pub struct InterimText {
    pub text: String,
    pub start_ms: u64,
}

/// A finalized transcript segment queued for commit.
#[derive(Debug)]
struct FinalSegment {
    text: String,
    confidence: Option<f32>,
    start_ms: u64,
    end_ms: u64,
}

/// Captured PCM accumulated for one recording, for per-utterance extraction.
struct SampleBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

struct ExtractedAudio {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl SampleBuffer {
    fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            channels: 1,
        }
    }

    fn extend(&mut self, chunk: &AudioChunk) {
        self.sample_rate = chunk.sample_rate;
        self.channels = chunk.channels;
        self.samples.extend_from_slice(&chunk.samples);
    }

    /// Samples covering [start_ms - pad, end_ms + pad], clamped to what has
    /// been captured so far. Offsets are relative to recording start.
    fn extract(&self, start_ms: u64, end_ms: u64, pad_ms: u64) -> ExtractedAudio {
        let to_index = |ms: u64| {
            (ms * self.sample_rate as u64 / 1000) as usize * self.channels.max(1) as usize
        };

        let lo = to_index(start_ms.saturating_sub(pad_ms)).min(self.samples.len());
        let hi = to_index(end_ms + pad_ms).min(self.samples.len());

        ExtractedAudio {
            samples: self.samples[lo..hi].to_vec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// One active recording: its tasks, shared flags and live-text channel.
struct ActiveRecording {
    running: Arc<AtomicBool>,
    capture: Box<dyn AudioCapture>,
    transcription: Arc<tokio::sync::Mutex<Box<dyn TranscriptionSession>>>,
    interim_rx: watch::Receiver<Option<InterimText>>,
    /// First unrecoverable failure, surfaced on `end`
    error: Arc<Mutex<Option<String>>>,
    pump_handle: JoinHandle<()>,
    event_handle: JoinHandle<()>,
    finalize_handle: JoinHandle<()>,
}

/// Drives live capture, transcription and speaker attribution for
/// IN_PROGRESS sessions.
///
/// Per recording, three cooperating tasks converge on the ledger:
/// - the audio pump forwards captured chunks to the transcription session
///   and accumulates them for per-utterance extraction;
/// - the event loop surfaces interim results and queues finalized segments;
/// - the finalize worker, a single consumer preserving finalization order,
///   stores each utterance's audio, identifies the speaker and appends to
///   the ledger.
pub struct RecordingController {
    config: RecordingConfig,
    sessions: Arc<dyn SessionRepository>,
    ledger: Arc<UtteranceLedger>,
    registry: Arc<VoiceprintRegistry>,
    store: Arc<dyn BlobStore>,
    captures: Arc<dyn CaptureFactory>,
    transcriber: Arc<dyn TranscriptionProvider>,
    active: Arc<RwLock<HashMap<String, ActiveRecording>>>,
}

impl RecordingController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RecordingConfig,
        sessions: Arc<dyn SessionRepository>,
        ledger: Arc<UtteranceLedger>,
        registry: Arc<VoiceprintRegistry>,
        store: Arc<dyn BlobStore>,
        captures: Arc<dyn CaptureFactory>,
        transcriber: Arc<dyn TranscriptionProvider>,
    ) -> Self {
        Self {
            config,
            sessions,
            ledger,
            registry,
            store,
            captures,
            transcriber,
            active: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Begin recording for an IN_PROGRESS session.
    ///
    /// At most one controller may be active per session; a concurrent
    /// second begin is rejected, not queued.
    pub async fn begin(&self, session_id: &str) -> Result<()> {
        let session = self
            .sessions
            .read(session_id)
            .await?
            .ok_or_else(|| Error::not_found("session", session_id))?;

        if !session.is_active() {
            return Err(Error::invalid_state(format!(
                "session {} is not in progress",
                session_id
            )));
        }

        // The slot lock is held across setup so a concurrent begin observes
        // either no slot (and races for this lock) or a fully built one.
        let mut active = self.active.write().await;
        if active.contains_key(session_id) {
            return Err(Error::invalid_state(format!(
                "recording already active for session {}",
                session_id
            )));
        }

        info!("Beginning recording for session {}", session_id);

        let mut capture = self.captures.open()?;
        let sample_rate = capture.sample_rate();
        let mut audio_rx = capture.start().await?;

        let mut transcription = match self.transcriber.open(sample_rate).await {
            Ok(stream) => stream,
            Err(e) => {
                // Capture already started; wind it down before failing.
                if let Err(stop) = capture.stop().await {
                    warn!("Failed to stop capture after setup failure: {}", stop);
                }
                return Err(e);
            }
        };
        let Some(mut events_rx) = transcription.take_events() else {
            if let Err(stop) = capture.stop().await {
                warn!("Failed to stop capture after setup failure: {}", stop);
            }
            return Err(Error::provider_fatal(
                "transcription session yielded no event stream",
            ));
        };
        let transcription = Arc::new(tokio::sync::Mutex::new(transcription));

        let running = Arc::new(AtomicBool::new(true));
        let error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let buffer = Arc::new(Mutex::new(SampleBuffer::new(sample_rate)));
        let (interim_tx, interim_rx) = watch::channel(None);
        let (finalize_tx, mut finalize_rx) = mpsc::channel::<FinalSegment>(64);

        // Audio pump task
        let pump_handle = tokio::spawn({
            let running = Arc::clone(&running);
            let buffer = Arc::clone(&buffer);
            let transcription = Arc::clone(&transcription);
            let error = Arc::clone(&error);
            let session_id = session_id.to_string();
            let max_retries = self.config.max_retries;
            let backoff = Duration::from_millis(self.config.retry_backoff_ms);

            async move {
                debug!("Audio pump started for {}", session_id);

                'capture: while let Some(chunk) = audio_rx.recv().await {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }

                    buffer.lock().expect("sample buffer poisoned").extend(&chunk);

                    let mut attempt = 0u32;
                    loop {
                        match transcription.lock().await.send(&chunk).await {
                            Ok(()) => break,
                            Err(e) if e.is_transient() && attempt < max_retries => {
                                attempt += 1;
                                warn!(
                                    "Transient transcription failure for {} (attempt {}/{}): {}",
                                    session_id, attempt, max_retries, e
                                );
                                tokio::time::sleep(backoff * attempt).await;
                            }
                            Err(e) => {
                                error!(
                                    "Unrecoverable transcription failure for {}: {}",
                                    session_id, e
                                );
                                *error.lock().expect("error slot poisoned") =
                                    Some(e.to_string());
                                running.store(false, Ordering::SeqCst);
                                break 'capture;
                            }
                        }
                    }
                }

                debug!("Audio pump stopped for {}", session_id);
            }
        });

        // Event loop task: interim results go to the live-text channel and
        // are never persisted; final results are queued in arrival order.
        let event_handle = tokio::spawn({
            let session_id = session_id.to_string();

            async move {
                debug!("Event loop started for {}", session_id);

                while let Some(event) = events_rx.recv().await {
                    match event {
                        TranscriptEvent::Interim { text, start_ms } => {
                            let _ = interim_tx.send(Some(InterimText { text, start_ms }));
                        }
                        TranscriptEvent::Final {
                            text,
                            confidence,
                            start_ms,
                            end_ms,
                        } => {
                            let _ = interim_tx.send(None);
                            let segment = FinalSegment {
                                text,
                                confidence,
                                start_ms,
                                end_ms,
                            };
                            if finalize_tx.send(segment).await.is_err() {
                                break;
                            }
                        }
                    }
                }

                debug!("Event loop stopped for {}", session_id);
            }
        });

        // Finalize worker: single consumer, so ledger appends follow
        // finalization order.
        let finalize_handle = tokio::spawn({
            let buffer = Arc::clone(&buffer);
            let error = Arc::clone(&error);
            let store = Arc::clone(&self.store);
            let registry = Arc::clone(&self.registry);
            let ledger = Arc::clone(&self.ledger);
            let session_id = session_id.to_string();
            let clinician_id = session.clinician_id.clone();
            let group_id = self.config.voiceprint_group_id.clone();
            let padding_ms = self.config.segment_padding_ms;
            let max_retries = self.config.max_retries;
            let backoff = Duration::from_millis(self.config.retry_backoff_ms);

            async move {
                debug!("Finalize worker started for {}", session_id);

                while let Some(segment) = finalize_rx.recv().await {
                    let extracted = buffer
                        .lock()
                        .expect("sample buffer poisoned")
                        .extract(segment.start_ms, segment.end_ms, padding_ms);

                    let mut audio_ref = None;
                    let mut wav: Option<Vec<u8>> = None;
                    if !extracted.samples.is_empty() {
                        match encode_wav(
                            &extracted.samples,
                            extracted.sample_rate,
                            extracted.channels,
                        ) {
                            Ok(bytes) => match store.put(&bytes).await {
                                Ok(reference) => {
                                    audio_ref = Some(reference);
                                    wav = Some(bytes);
                                }
                                Err(e) => {
                                    warn!("Failed to store utterance audio: {}", e)
                                }
                            },
                            Err(e) => warn!("Failed to encode utterance audio: {}", e),
                        }
                    }

                    let speaker = match &wav {
                        Some(bytes) => {
                            identify_speaker(
                                &registry,
                                bytes,
                                extracted.sample_rate,
                                &group_id,
                                &clinician_id,
                                max_retries,
                                backoff,
                            )
                            .await
                        }
                        None => Speaker::Patient,
                    };

                    let draft = DraftUtterance {
                        speaker,
                        text: segment.text,
                        confidence: segment.confidence,
                        start_ms: segment.start_ms,
                        end_ms: segment.end_ms,
                        audio_ref,
                    };

                    if let Err(e) = ledger.append(&session_id, draft).await {
                        error!("Failed to append utterance for {}: {}", session_id, e);
                        *error.lock().expect("error slot poisoned") = Some(e.to_string());
                    }
                }

                debug!("Finalize worker stopped for {}", session_id);
            }
        });

        active.insert(
            session_id.to_string(),
            ActiveRecording {
                running,
                capture,
                transcription,
                interim_rx,
                error,
                pump_handle,
                event_handle,
                finalize_handle,
            },
        );

        info!("Recording started for session {}", session_id);
        Ok(())
    }

    /// Whether a recording is currently active for a session.
    pub async fn is_active(&self, session_id: &str) -> bool {
        self.active.read().await.contains_key(session_id)
    }

    /// Current in-flight transcription text, if any.
    pub async fn live_text(&self, session_id: &str) -> Result<Option<InterimText>> {
        let active = self.active.read().await;
        let recording = active
            .get(session_id)
            .ok_or_else(|| Error::not_found("recording", session_id))?;
        let interim = recording.interim_rx.borrow().clone();
        Ok(interim)
    }

    /// End the recording for a session.
    ///
    /// Stops capture, flushes the transcription session and waits a bounded
    /// grace period for in-flight finalization; whatever has not committed
    /// by the deadline is discarded. Safe to call after the underlying
    /// streams have already failed.
    pub async fn end(&self, session_id: &str) -> Result<()> {
        let recording = self
            .active
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| Error::not_found("recording", session_id))?;

        info!("Ending recording for session {}", session_id);

        let ActiveRecording {
            running,
            mut capture,
            transcription,
            error,
            pump_handle,
            event_handle,
            finalize_handle,
            ..
        } = recording;

        running.store(false, Ordering::SeqCst);

        if let Err(e) = capture.stop().await {
            warn!("Failed to stop capture for {}: {}", session_id, e);
        }

        if let Err(e) = transcription.lock().await.finish().await {
            warn!("Failed to finish transcription for {}: {}", session_id, e);
        }

        let grace = Duration::from_millis(self.config.drain_grace_ms);
        for (name, mut handle) in [
            ("audio pump", pump_handle),
            ("event loop", event_handle),
            ("finalize worker", finalize_handle),
        ] {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("{} task panicked for {}: {}", name, session_id, e),
                Err(_) => {
                    warn!(
                        "{} for {} did not drain within {}ms; aborting",
                        name,
                        session_id,
                        grace.as_millis()
                    );
                    handle.abort();
                }
            }
        }

        info!("Recording ended for session {}", session_id);

        if let Some(message) = error.lock().expect("error slot poisoned").take() {
            return Err(Error::provider_fatal(message));
        }
        Ok(())
    }
}

/// Identify the speaker of one utterance, retrying transient failures.
/// No match, exhausted retries and unrecoverable errors all attribute the
/// utterance to the patient.
async fn identify_speaker(
    registry: &VoiceprintRegistry,
    audio: &[u8],
    sample_rate: u32,
    group_id: &str,
    clinician_id: &str,
    max_retries: u32,
    backoff: Duration,
) -> Speaker {
    let mut attempt = 0u32;
    loop {
        match registry.identify(audio, sample_rate, group_id).await {
            Ok(Some(m)) if m.speaker_id == clinician_id => return Speaker::Clinician,
            Ok(_) => return Speaker::Patient,
            Err(e) if e.is_transient() && attempt < max_retries => {
                attempt += 1;
                warn!(
                    "Transient identification failure (attempt {}/{}): {}",
                    attempt, max_retries, e
                );
                tokio::time::sleep(backoff * attempt).await;
            }
            Err(e) => {
                warn!("Speaker identification failed, attributing to patient: {}", e);
                return Speaker::Patient;
            }
        }
    }
}
