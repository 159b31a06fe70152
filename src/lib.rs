pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod http;
pub mod recording;
pub mod repos;
pub mod session;
pub mod storage;
pub mod transcription;
pub mod voiceprint;

pub use audio::{AudioCapture, AudioChunk, CaptureFactory, WavFileCapture};
pub use config::Config;
pub use error::{Error, Result};
pub use export::{ExportPipeline, ExportSummary};
pub use http::{create_router, AppState};
pub use recording::{InterimText, RecordingConfig, RecordingController};
pub use repos::{
    EnrollmentRepository, InMemoryEnrollmentRepository, InMemorySessionRepository,
    InMemoryUtteranceRepository, SessionRepository, UtteranceRepository,
};
pub use session::{
    CreateSession, DraftUtterance, Session, SessionService, SessionStatus, Speaker,
    UpdateSessionInfo, Utterance, UtteranceLedger,
};
pub use storage::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use transcription::{TranscriptEvent, TranscriptionProvider, TranscriptionSession};
pub use voiceprint::{Enrollment, SpeakerMatch, VoiceprintProvider, VoiceprintRegistry};
