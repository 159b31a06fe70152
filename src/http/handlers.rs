use super::state::AppState;
use crate::error::Error;
use crate::session::{CreateSession, UpdateSessionInfo};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub clinician_id: String,
    pub patient_name: Option<String>,
    pub clinic_number: Option<String>,
    pub medical_record_number: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub patient_name: Option<String>,
    pub clinic_number: Option<String>,
    pub medical_record_number: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub destination_root: PathBuf,
    #[serde(default)]
    pub include_audio: bool,
}

#[derive(Debug, Deserialize)]
pub struct UsbExportRequest {
    pub mount_point: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct EnrollParams {
    pub sample_rate: u32,
    pub text: String,
    pub group_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    #[serde(flatten)]
    pub session: crate::session::Session,
    pub recording_active: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn fail(error: Error) -> Response {
    let status = match &error {
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::InvalidState { .. } | Error::ExportConflict { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Create a new session in DRAFT
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    let request = CreateSession {
        clinician_id: req.clinician_id,
        patient_name: req.patient_name,
        clinic_number: req.clinic_number,
        medical_record_number: req.medical_record_number,
        diagnosis: req.diagnosis,
        notes: req.notes,
    };

    match state.sessions.create(request).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => {
            error!("Failed to create session: {}", e);
            fail(e)
        }
    }
}

/// POST /sessions/:session_id/start
/// Start the session and begin live recording
pub async fn start_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let session = match state.sessions.start(&session_id).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to start session {}: {}", session_id, e);
            return fail(e);
        }
    };

    if let Err(e) = state.recorder.begin(&session_id).await {
        error!("Failed to begin recording for {}: {}", session_id, e);
        return fail(e);
    }

    info!("Session {} started and recording", session_id);
    (StatusCode::OK, Json(session)).into_response()
}

/// POST /sessions/:session_id/stop
/// End recording and complete the session
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.recorder.end(&session_id).await {
        // No active recording is fine: the session may never have begun
        // capture, or the controller already shut down.
        Ok(()) | Err(Error::NotFound { .. }) => {}
        Err(e) => {
            error!("Failed to end recording for {}: {}", session_id, e);
            return fail(e);
        }
    }

    match state.sessions.complete(&session_id).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => {
            error!("Failed to complete session {}: {}", session_id, e);
            fail(e)
        }
    }
}

/// POST /sessions/:session_id/cancel
/// End recording (best effort) and cancel the session
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.recorder.end(&session_id).await {
        Ok(()) | Err(Error::NotFound { .. }) => {}
        Err(e) => {
            // Cancellation proceeds regardless; the failure is still logged.
            warn!("Recording teardown failed for {}: {}", session_id, e);
        }
    }

    match state.sessions.cancel(&session_id).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => {
            error!("Failed to cancel session {}: {}", session_id, e);
            fail(e)
        }
    }
}

/// GET /sessions/:session_id
/// Session metadata plus whether a recording is active
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.sessions.get(&session_id).await {
        Ok(session) => {
            let recording_active = state.recorder.is_active(&session_id).await;
            (
                StatusCode::OK,
                Json(SessionStatusResponse {
                    session,
                    recording_active,
                }),
            )
                .into_response()
        }
        Err(e) => fail(e),
    }
}

/// PATCH /sessions/:session_id
/// Update clinical information
pub async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Response {
    let update = UpdateSessionInfo {
        patient_name: req.patient_name,
        clinic_number: req.clinic_number,
        medical_record_number: req.medical_record_number,
        diagnosis: req.diagnosis,
        notes: req.notes,
    };

    match state.sessions.update_info(&session_id, update).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => {
            error!("Failed to update session {}: {}", session_id, e);
            fail(e)
        }
    }
}

/// GET /clinicians/:clinician_id/sessions
/// Sessions owned by a clinician, most recent first
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(clinician_id): Path<String>,
) -> Response {
    match state.sessions.list(&clinician_id).await {
        Ok(sessions) => (StatusCode::OK, Json(sessions)).into_response(),
        Err(e) => fail(e),
    }
}

/// GET /sessions/:session_id/utterances
/// Committed utterances in sequence order
pub async fn get_utterances(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.sessions.utterances(&session_id).await {
        Ok(utterances) => (StatusCode::OK, Json(utterances)).into_response(),
        Err(e) => fail(e),
    }
}

/// GET /sessions/:session_id/live
/// Current in-flight transcription text
pub async fn get_live_text(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.recorder.live_text(&session_id).await {
        Ok(interim) => (StatusCode::OK, Json(interim)).into_response(),
        Err(e) => fail(e),
    }
}

/// POST /sessions/:session_id/export
/// Export the session to a destination directory
pub async fn export_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<ExportRequest>,
) -> Response {
    match state
        .exporter
        .export(&session_id, &req.destination_root, req.include_audio)
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!("Failed to export session {}: {}", session_id, e);
            fail(e)
        }
    }
}

/// POST /sessions/:session_id/export/usb
/// Export the session to a USB mount point
pub async fn export_session_usb(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<UsbExportRequest>,
) -> Response {
    match state
        .exporter
        .export_to_usb(&session_id, &req.mount_point)
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!("Failed to export session {} to USB: {}", session_id, e);
            fail(e)
        }
    }
}

/// POST /speakers/:speaker_id/voiceprint
/// Register a voiceprint; the raw body is the WAV enrollment sample
pub async fn enroll_voiceprint(
    State(state): State<AppState>,
    Path(speaker_id): Path<String>,
    Query(params): Query<EnrollParams>,
    body: Bytes,
) -> Response {
    match state
        .registry
        .register(
            &speaker_id,
            &body,
            params.sample_rate,
            &params.text,
            &params.group_id,
        )
        .await
    {
        Ok(enrollment) => (StatusCode::OK, Json(enrollment)).into_response(),
        Err(e) => {
            error!("Failed to enroll voiceprint for {}: {}", speaker_id, e);
            fail(e)
        }
    }
}

/// GET /speakers/:speaker_id/voiceprint
/// Current enrollment for a speaker
pub async fn get_voiceprint(
    State(state): State<AppState>,
    Path(speaker_id): Path<String>,
) -> Response {
    match state.registry.get_enrollment(&speaker_id).await {
        Ok(Some(enrollment)) => (StatusCode::OK, Json(enrollment)).into_response(),
        Ok(None) => fail(Error::not_found("enrollment", speaker_id)),
        Err(e) => fail(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
