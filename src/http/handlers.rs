use super::state::AppState;
use crate::audio::CaptureError;
use crate::recognize::{ModelReadiness, ModelTier, RecognizeError};
use crate::session::SessionError;
use crate::store::{Meeting, StoreError};
use crate::summary::{SummaryError, SummaryRequest};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetailResponse {
    pub error: String,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub status: String,
    pub message: String,

    /// The meeting saved on stop, when auto-save found a transcript
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<Meeting>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptUpdateRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantsRequest {
    pub participants: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TierRequest {
    pub tier: ModelTier,
}

#[derive(Debug, Serialize)]
pub struct TierResponse {
    pub tier: ModelTier,
}

#[derive(Debug, Deserialize)]
pub struct LoadModelRequest {
    pub tier: ModelTier,
}

#[derive(Debug, Deserialize)]
pub struct ModelStatusQuery {
    /// Tier to report on (defaults to the session's active tier)
    pub tier: Option<ModelTier>,
}

#[derive(Debug, Serialize)]
pub struct ModelStatusResponse {
    pub tier: ModelTier,
    pub status: ModelReadiness,

    /// Failure message from the last load attempt, if it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    /// Must be true; clearing everything is not the default anything
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryOverrideRequest {
    /// Text to summarize instead of the saved meeting's transcript
    #[serde(default)]
    pub text: Option<String>,

    /// Participants to mention instead of the saved meeting's
    #[serde(default)]
    pub participants: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(rename = "markdownSummary")]
    pub markdown_summary: String,
}

// ============================================================================
// Error Mapping
// ============================================================================

fn session_error(e: SessionError) -> Response {
    let status = match &e {
        SessionError::AlreadyRecording | SessionError::StillRecording => StatusCode::CONFLICT,
        SessionError::EmptyTranscript => StatusCode::BAD_REQUEST,
        SessionError::ModelNotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Capture(CaptureError::UnsupportedEnvironment(_))
        | SessionError::Capture(CaptureError::DeviceUnavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SessionError::Capture(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::Recognize(RecognizeError::ModelUnavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SessionError::Recognize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::Store(e) => store_status(e),
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::DuplicateId(_) => StatusCode::CONFLICT,
        StoreError::InvalidImportFormat(_) => StatusCode::BAD_REQUEST,
        StoreError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /session/status
/// Current session state, model readiness, and counters
pub async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.session.stats().await;
    (StatusCode::OK, Json(stats)).into_response()
}

/// POST /session/start
/// Start recording
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StartResponse {
                status: "recording".to_string(),
                message: "Recording started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            session_error(e)
        }
    }
}

/// POST /session/stop
/// Stop recording, auto-saving the draft when configured
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.stop().await {
        Ok(saved) => {
            let message = match &saved {
                Some(meeting) => format!("Recording stopped, saved {}", meeting.id),
                None => "Recording stopped".to_string(),
            };
            (
                StatusCode::OK,
                Json(StopResponse {
                    status: "idle".to_string(),
                    message,
                    saved,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            session_error(e)
        }
    }
}

/// POST /session/save
/// Save the draft transcript as a new meeting
pub async fn save_draft(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.save_draft().await {
        Ok(meeting) => (StatusCode::OK, Json(meeting)).into_response(),
        Err(e) => session_error(e),
    }
}

/// GET /session/transcript
/// The draft transcript accumulated so far
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let text = state.session.transcript().await;
    (StatusCode::OK, Json(TranscriptResponse { text })).into_response()
}

/// PUT /session/transcript
/// Replace the draft transcript (e.g. after manual editing)
pub async fn set_transcript(
    State(state): State<AppState>,
    Json(req): Json<TranscriptUpdateRequest>,
) -> impl IntoResponse {
    state.session.set_transcript(req.text).await;
    let text = state.session.transcript().await;
    (StatusCode::OK, Json(TranscriptResponse { text })).into_response()
}

/// PUT /session/participants
/// Replace the participant list for the next saved meeting
pub async fn set_participants(
    State(state): State<AppState>,
    Json(req): Json<ParticipantsRequest>,
) -> impl IntoResponse {
    let participants = state.session.set_participants(req.participants).await;
    (StatusCode::OK, Json(ParticipantsResponse { participants })).into_response()
}

/// PUT /session/tier
/// Switch the recognition tier, loading its model first
pub async fn set_tier(
    State(state): State<AppState>,
    Json(req): Json<TierRequest>,
) -> impl IntoResponse {
    match state.session.set_tier(req.tier).await {
        Ok(()) => (StatusCode::OK, Json(TierResponse { tier: req.tier })).into_response(),
        Err(e) => {
            error!("Failed to switch tier: {}", e);
            session_error(e)
        }
    }
}

/// POST /models/load
/// Load a tier's model without touching the session
pub async fn load_model(
    State(state): State<AppState>,
    Json(req): Json<LoadModelRequest>,
) -> impl IntoResponse {
    info!("Model load requested for tier {}", req.tier);

    match state.recognizer.ensure_loaded(req.tier).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ModelStatusResponse {
                tier: req.tier,
                status: ModelReadiness::Ready,
                detail: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to load {} model: {}", req.tier, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /models/status
/// Readiness of a tier's model (defaults to the active tier)
pub async fn model_status(
    State(state): State<AppState>,
    Query(query): Query<ModelStatusQuery>,
) -> impl IntoResponse {
    let tier = match query.tier {
        Some(tier) => tier,
        None => state.session.active_tier().await,
    };

    let status = state.recognizer.readiness(tier).await;
    let detail = match status {
        ModelReadiness::Failed => state.recognizer.failure(tier).await,
        _ => None,
    };

    (
        StatusCode::OK,
        Json(ModelStatusResponse {
            tier,
            status,
            detail,
        }),
    )
        .into_response()
}

/// GET /meetings
/// List saved meetings, newest first
pub async fn list_meetings(State(state): State<AppState>) -> impl IntoResponse {
    let meetings = state.store.list().await;
    (StatusCode::OK, Json(meetings)).into_response()
}

/// DELETE /meetings/:meeting_id
/// Delete one saved meeting
pub async fn delete_meeting(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> impl IntoResponse {
    if state.store.delete(&meeting_id).await {
        (
            StatusCode::OK,
            Json(DeletedResponse {
                deleted: meeting_id,
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("meeting {} not found", meeting_id),
            }),
        )
            .into_response()
    }
}

/// POST /meetings/clear
/// Delete every saved meeting; requires explicit confirmation
pub async fn clear_meetings(
    State(state): State<AppState>,
    Json(req): Json<ClearRequest>,
) -> impl IntoResponse {
    if !req.confirm {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "clearing all meetings requires {\"confirm\": true}".to_string(),
            }),
        )
            .into_response();
    }

    let cleared = state.store.clear_all().await;
    (StatusCode::OK, Json(ClearResponse { cleared })).into_response()
}

/// GET /meetings/export
/// Download every saved meeting as a JSON attachment
pub async fn export_meetings(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.export_all().await {
        Ok(json) => {
            let filename = format!("meeting-transcriptions-{}.json", Utc::now().format("%Y-%m-%d"));
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", filename),
                    ),
                ],
                json,
            )
                .into_response()
        }
        Err(e) => {
            error!("Export failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /meetings/import
/// Merge an exported JSON payload; all-or-nothing on validation
pub async fn import_meetings(State(state): State<AppState>, payload: String) -> impl IntoResponse {
    match state.store.import_merge(&payload).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(StoreError::InvalidImportFormat(details)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorDetailResponse {
                error: "Invalid import format".to_string(),
                details,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Import failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /meetings/:meeting_id/summary
/// Generate a Markdown summary for a saved meeting and attach it
pub async fn generate_summary(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
    body: Option<Json<SummaryOverrideRequest>>,
) -> impl IntoResponse {
    let meeting = match state.store.get(&meeting_id).await {
        Some(meeting) => meeting,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("meeting {} not found", meeting_id),
                }),
            )
                .into_response()
        }
    };

    let overrides = body.map(|Json(b)| b);
    let request = SummaryRequest {
        text: overrides
            .as_ref()
            .and_then(|b| b.text.clone())
            .unwrap_or_else(|| meeting.text.clone()),
        participants: overrides
            .and_then(|b| b.participants)
            .unwrap_or_else(|| meeting.participants.clone()),
    };

    match state.summary.generate_summary(&meeting_id, &request).await {
        Ok(markdown) => {
            if state
                .store
                .update_summary(&meeting_id, markdown.clone())
                .await
                .is_none()
            {
                warn!(
                    "Meeting {} was deleted before its summary could be attached",
                    meeting_id
                );
            }
            (
                StatusCode::OK,
                Json(SummaryResponse {
                    markdown_summary: markdown,
                }),
            )
                .into_response()
        }
        Err(SummaryError::EmptyText) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorDetailResponse {
                error: "Invalid request body".to_string(),
                details: "Transcript text cannot be empty.".to_string(),
            }),
        )
            .into_response(),
        Err(e @ SummaryError::AlreadyInFlight(_)) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
        Err(SummaryError::GenerationFailed(details)) => {
            error!("Summary generation failed for {}: {}", meeting_id, details);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorDetailResponse {
                    error: "Failed to generate summary".to_string(),
                    details,
                }),
            )
                .into_response()
        }
    }
}
