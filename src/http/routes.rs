use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/:session_id",
            get(handlers::get_session).patch(handlers::update_session),
        )
        .route("/sessions/:session_id/start", post(handlers::start_session))
        .route("/sessions/:session_id/stop", post(handlers::stop_session))
        .route(
            "/sessions/:session_id/cancel",
            post(handlers::cancel_session),
        )
        // Conversation queries
        .route(
            "/sessions/:session_id/utterances",
            get(handlers::get_utterances),
        )
        .route("/sessions/:session_id/live", get(handlers::get_live_text))
        // Export
        .route(
            "/sessions/:session_id/export",
            post(handlers::export_session),
        )
        .route(
            "/sessions/:session_id/export/usb",
            post(handlers::export_session_usb),
        )
        // Clinician queries
        .route(
            "/clinicians/:clinician_id/sessions",
            get(handlers::list_sessions),
        )
        // Voiceprints
        .route(
            "/speakers/:speaker_id/voiceprint",
            post(handlers::enroll_voiceprint).get(handlers::get_voiceprint),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
