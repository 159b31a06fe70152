//! Live recording orchestration
//!
//! The `RecordingController` owns the concurrency contract between audio
//! capture, streaming transcription and speaker attribution for sessions
//! that are in progress.

pub mod controller;

pub use controller::{InterimText, RecordingConfig, RecordingController};
