use crate::recognize::Recognizer;
use crate::session::TranscriptionSession;
use crate::store::TranscriptionStore;
use crate::summary::SummaryClient;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single transcription session this process drives
    pub session: Arc<TranscriptionSession>,

    /// Saved meeting persistence
    pub store: Arc<TranscriptionStore>,

    /// Model loading and readiness reporting
    pub recognizer: Arc<Recognizer>,

    /// Summary generation against the upstream text model
    pub summary: Arc<SummaryClient>,
}

impl AppState {
    pub fn new(
        session: Arc<TranscriptionSession>,
        store: Arc<TranscriptionStore>,
        recognizer: Arc<Recognizer>,
        summary: Arc<SummaryClient>,
    ) -> Self {
        Self {
            session,
            store,
            recognizer,
            summary,
        }
    }
}
