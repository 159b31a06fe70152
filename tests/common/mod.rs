// Shared test doubles: scripted capture and transcription providers, a
// fake voiceprint provider and a call-counting blob store, wired into a
// fully constructed service stack.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use medscribe::error::{Error, Result};
use medscribe::{
    AudioCapture, AudioChunk, BlobStore, CaptureFactory, EnrollmentRepository, ExportPipeline,
    InMemoryEnrollmentRepository, InMemorySessionRepository, InMemoryUtteranceRepository,
    MemoryBlobStore, RecordingConfig, RecordingController, SessionRepository, SessionService,
    SpeakerMatch, TranscriptEvent, TranscriptionProvider, TranscriptionSession,
    UtteranceLedger, UtteranceRepository, VoiceprintProvider, VoiceprintRegistry,
};

// ============================================================================
// Audio capture
// ============================================================================

/// Emits the scripted chunks, then keeps the stream open until stopped,
/// like a live microphone.
pub struct ScriptedCapture {
    chunks: Vec<AudioChunk>,
    sample_rate: u32,
    capturing: Arc<AtomicBool>,
}

impl ScriptedCapture {
    pub fn new(chunks: Vec<AudioChunk>, sample_rate: u32) -> Self {
        Self {
            chunks,
            sample_rate,
            capturing: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for ScriptedCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>> {
        let (tx, rx) = mpsc::channel(64);
        let chunks = self.chunks.clone();
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            for chunk in chunks {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            while capturing.load(Ordering::SeqCst) && !tx.is_closed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
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
        "scripted"
    }
}

pub struct ScriptedCaptureFactory {
    chunks: Vec<AudioChunk>,
    sample_rate: u32,
    pub opened: AtomicUsize,
}

impl ScriptedCaptureFactory {
    pub fn new(chunks: Vec<AudioChunk>, sample_rate: u32) -> Self {
        Self {
            chunks,
            sample_rate,
            opened: AtomicUsize::new(0),
        }
    }
}

impl CaptureFactory for ScriptedCaptureFactory {
    fn open(&self) -> Result<Box<dyn AudioCapture>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedCapture::new(
            self.chunks.clone(),
            self.sample_rate,
        )))
    }
}

/// Contiguous 100ms chunks of constant-amplitude PCM.
pub fn pcm_chunks(total_ms: u64, sample_rate: u32) -> Vec<AudioChunk> {
    let samples_per_chunk = (sample_rate / 10) as usize;
    (0..total_ms / 100)
        .map(|i| AudioChunk {
            samples: vec![1000i16; samples_per_chunk],
            sample_rate,
            channels: 1,
            timestamp_ms: i * 100,
        })
        .collect()
}

// ============================================================================
// Transcription
// ============================================================================

/// Scripted transcription provider.
///
/// `immediate_events` are buffered into the event channel as soon as a
/// session opens; `flush_events` are delivered when `finish` is called,
/// modelling a provider that finalizes pending segments at stream end.
pub struct ScriptedTranscriptionProvider {
    immediate_events: Vec<TranscriptEvent>,
    flush_events: Vec<TranscriptEvent>,
    pub sends: Arc<AtomicUsize>,
    pub transient_send_failures: Arc<AtomicUsize>,
    pub fatal_sends: Arc<AtomicBool>,
    pub opened: AtomicUsize,
}

impl ScriptedTranscriptionProvider {
    pub fn new(immediate_events: Vec<TranscriptEvent>, flush_events: Vec<TranscriptEvent>) -> Self {
        Self {
            immediate_events,
            flush_events,
            sends: Arc::new(AtomicUsize::new(0)),
            transient_send_failures: Arc::new(AtomicUsize::new(0)),
            fatal_sends: Arc::new(AtomicBool::new(false)),
            opened: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl TranscriptionProvider for ScriptedTranscriptionProvider {
    async fn open(&self, _sample_rate: u32) -> Result<Box<dyn TranscriptionSession>> {
        self.opened.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(256);
        for event in &self.immediate_events {
            tx.try_send(event.clone()).expect("event buffer full");
        }

        Ok(Box::new(ScriptedTranscriptionSession {
            tx: Some(tx),
            rx: Some(rx),
            flush_events: self.flush_events.clone(),
            sends: Arc::clone(&self.sends),
            transient_send_failures: Arc::clone(&self.transient_send_failures),
            fatal_sends: Arc::clone(&self.fatal_sends),
        }))
    }
}

pub struct ScriptedTranscriptionSession {
    tx: Option<mpsc::Sender<TranscriptEvent>>,
    rx: Option<mpsc::Receiver<TranscriptEvent>>,
    flush_events: Vec<TranscriptEvent>,
    sends: Arc<AtomicUsize>,
    transient_send_failures: Arc<AtomicUsize>,
    fatal_sends: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl TranscriptionSession for ScriptedTranscriptionSession {
    async fn send(&mut self, _chunk: &AudioChunk) -> Result<()> {
        self.sends.fetch_add(1, Ordering::SeqCst);

        if self.fatal_sends.load(Ordering::SeqCst) {
            return Err(Error::provider_fatal("transcription stream rejected audio"));
        }

        let remaining = self.transient_send_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_send_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(Error::provider_transient("transcription request timed out"));
        }

        Ok(())
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<TranscriptEvent>> {
        self.rx.take()
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            for event in self.flush_events.drain(..) {
                let _ = tx.send(event).await;
            }
            // tx dropped here closes the event channel
        }
        Ok(())
    }
}

// ============================================================================
// Voiceprint provider
// ============================================================================

#[derive(Default)]
pub struct FakeVoiceprintProvider {
    pub fail_enroll: AtomicBool,
    pub enroll_calls: AtomicUsize,
    pub identify_calls: AtomicUsize,
    /// (speaker_id, confidence) returned by identify, None for no match
    pub best_match: Mutex<Option<(String, f32)>>,
}

impl FakeVoiceprintProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_match(&self, speaker_id: &str, confidence: f32) {
        *self.best_match.lock().unwrap() = Some((speaker_id.to_string(), confidence));
    }
}

#[async_trait::async_trait]
impl VoiceprintProvider for FakeVoiceprintProvider {
    async fn enroll(
        &self,
        _audio: &[u8],
        _sample_rate: u32,
        _enrollment_text: &str,
        _group_id: &str,
    ) -> Result<String> {
        let call = self.enroll_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_enroll.load(Ordering::SeqCst) {
            return Err(Error::provider_fatal("enrollment rejected"));
        }
        Ok(format!("vp-{call}"))
    }

    async fn identify(
        &self,
        _audio: &[u8],
        _sample_rate: u32,
        _group_id: &str,
    ) -> Result<Option<SpeakerMatch>> {
        self.identify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .best_match
            .lock()
            .unwrap()
            .clone()
            .map(|(speaker_id, confidence)| SpeakerMatch {
                speaker_id,
                confidence,
            }))
    }

    fn name(&self) -> &str {
        "fake-vpr"
    }

    fn endpoint(&self) -> &str {
        "local://fake-vpr"
    }
}

// ============================================================================
// Blob store
// ============================================================================

/// Memory blob store that counts calls, for rollback assertions.
#[derive(Default)]
pub struct CountingBlobStore {
    inner: MemoryBlobStore,
    pub puts: AtomicUsize,
    pub gets: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, reference: &str) -> bool {
        self.inner.contains(reference).await
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait::async_trait]
impl BlobStore for CountingBlobStore {
    async fn put(&self, data: &[u8]) -> Result<String> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(data).await
    }

    async fn get(&self, reference: &str) -> Result<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(reference).await
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(reference).await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub const GROUP_ID: &str = "clinic-test";

pub struct Harness {
    pub service: Arc<SessionService>,
    pub ledger: Arc<UtteranceLedger>,
    pub registry: Arc<VoiceprintRegistry>,
    pub controller: Arc<RecordingController>,
    pub exporter: Arc<ExportPipeline>,
    pub store: Arc<CountingBlobStore>,
    pub vpr: Arc<FakeVoiceprintProvider>,
    pub transcription: Arc<ScriptedTranscriptionProvider>,
    pub captures: Arc<ScriptedCaptureFactory>,
    pub sessions_repo: Arc<InMemorySessionRepository>,
}

/// Build the full service stack with scripted capture and transcription.
pub fn harness(
    chunks: Vec<AudioChunk>,
    immediate_events: Vec<TranscriptEvent>,
    flush_events: Vec<TranscriptEvent>,
) -> Harness {
    let sessions_repo = Arc::new(InMemorySessionRepository::new());
    let utterances_repo = Arc::new(InMemoryUtteranceRepository::new());
    let enrollments_repo = Arc::new(InMemoryEnrollmentRepository::new());

    let store = Arc::new(CountingBlobStore::new());
    let vpr = Arc::new(FakeVoiceprintProvider::new());
    let transcription = Arc::new(ScriptedTranscriptionProvider::new(
        immediate_events,
        flush_events,
    ));
    let captures = Arc::new(ScriptedCaptureFactory::new(chunks, 16000));

    let service = Arc::new(SessionService::new(
        sessions_repo.clone() as Arc<dyn SessionRepository>,
        utterances_repo.clone() as Arc<dyn UtteranceRepository>,
    ));
    let ledger = Arc::new(UtteranceLedger::new(
        utterances_repo as Arc<dyn UtteranceRepository>,
    ));
    let registry = Arc::new(VoiceprintRegistry::new(
        enrollments_repo as Arc<dyn EnrollmentRepository>,
        store.clone() as Arc<dyn BlobStore>,
        vpr.clone() as Arc<dyn VoiceprintProvider>,
        0.6,
    ));

    let config = RecordingConfig {
        segment_padding_ms: 200,
        max_retries: 3,
        retry_backoff_ms: 10,
        drain_grace_ms: 2000,
        voiceprint_group_id: GROUP_ID.to_string(),
    };

    let controller = Arc::new(RecordingController::new(
        config,
        sessions_repo.clone() as Arc<dyn SessionRepository>,
        ledger.clone(),
        registry.clone(),
        store.clone() as Arc<dyn BlobStore>,
        captures.clone() as Arc<dyn CaptureFactory>,
        transcription.clone() as Arc<dyn TranscriptionProvider>,
    ));

    let exporter = Arc::new(ExportPipeline::new(
        sessions_repo.clone() as Arc<dyn SessionRepository>,
        ledger.clone(),
        store.clone() as Arc<dyn BlobStore>,
    ));

    Harness {
        service,
        ledger,
        registry,
        controller,
        exporter,
        store,
        vpr,
        transcription,
        captures,
        sessions_repo,
    }
}
