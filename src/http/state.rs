use std::sync::Arc;

use crate::export::ExportPipeline;
use crate::recording::RecordingController;
use crate::session::SessionService;
use crate::voiceprint::VoiceprintRegistry;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub recorder: Arc<RecordingController>,
    pub registry: Arc<VoiceprintRegistry>,
    pub exporter: Arc<ExportPipeline>,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionService>,
        recorder: Arc<RecordingController>,
        registry: Arc<VoiceprintRegistry>,
        exporter: Arc<ExportPipeline>,
    ) -> Self {
        Self {
            sessions,
            recorder,
            registry,
            exporter,
        }
    }
}
