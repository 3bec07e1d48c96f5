//! HTTP API server for the transcription workflow
//!
//! This module provides a REST API for driving the session and the
//! saved-meeting store:
//! - POST /session/start - Start recording
//! - POST /session/stop - Stop recording (auto-saves the draft)
//! - POST /session/save - Save the draft transcript manually
//! - GET  /session/status - Session state and counters
//! - GET/PUT /session/transcript - Read or replace the draft
//! - PUT  /session/participants - Set participants for the next save
//! - PUT  /session/tier - Switch the recognition tier
//! - POST /models/load - Load a model tier
//! - GET  /models/status - Model readiness
//! - GET  /meetings - List saved meetings
//! - DELETE /meetings/:id - Delete one meeting
//! - POST /meetings/clear - Delete everything (confirmed)
//! - GET  /meetings/export - Download all meetings as JSON
//! - POST /meetings/import - Merge an exported payload
//! - POST /meetings/:id/summary - Generate a Markdown summary
//! - GET  /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
