use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::recognize::{ModelReadiness, ModelTier};
use crate::store::StorageHealth;

/// Whether the session is currently capturing audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Recording,
}

/// Point-in-time view of a transcription session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Whether recording is currently active
    pub state: SessionState,

    /// Tier used for chunks recognized from here on
    pub active_tier: ModelTier,

    /// Where the active tier's model stands
    pub model_readiness: ModelReadiness,

    /// Whether this build has a capture backend for the configured source
    pub capture_supported: bool,

    /// When the current (or most recent) recording started
    pub started_at: Option<DateTime<Utc>>,

    /// Elapsed recording time in seconds, 0 while idle
    pub duration_secs: f64,

    /// Number of audio chunks handed to recognition so far
    pub chunks_captured: usize,

    /// Number of recognized fragments appended to the draft
    pub fragments_recognized: usize,

    /// Length of the draft transcript in characters
    pub transcript_chars: usize,

    /// Participants attached to the next saved meeting
    pub participants: Vec<String>,

    /// Whether saved meetings survive a restart
    pub storage: StorageHealth,
}
