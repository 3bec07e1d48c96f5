//! Transcription session management
//!
//! This module provides the `TranscriptionSession` abstraction that manages:
//! - Audio capture from the configured source
//! - Chunk recognition through the shared `Recognizer`
//! - The draft transcript accumulated across recordings
//! - Auto-save on stop and manual draft saves
//! - Session statistics and state reporting

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::{SessionError, TranscriptionSession};
pub use stats::{SessionState, SessionStats};
