use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/session/status", get(handlers::session_status))
        .route("/session/start", post(handlers::start_recording))
        .route("/session/stop", post(handlers::stop_recording))
        .route("/session/save", post(handlers::save_draft))
        .route(
            "/session/transcript",
            get(handlers::get_transcript).put(handlers::set_transcript),
        )
        .route("/session/participants", put(handlers::set_participants))
        .route("/session/tier", put(handlers::set_tier))
        // Model management
        .route("/models/load", post(handlers::load_model))
        .route("/models/status", get(handlers::model_status))
        // Saved meetings
        .route("/meetings", get(handlers::list_meetings))
        .route("/meetings/export", get(handlers::export_meetings))
        .route("/meetings/import", post(handlers::import_meetings))
        .route("/meetings/clear", post(handlers::clear_meetings))
        .route("/meetings/:meeting_id", delete(handlers::delete_meeting))
        .route(
            "/meetings/:meeting_id/summary",
            post(handlers::generate_summary),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        // The browser UI is served from another origin during development
        .layer(CorsLayer::permissive())
        .with_state(state)
}
