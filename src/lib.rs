pub mod audio;
pub mod config;
pub mod http;
pub mod recognize;
pub mod session;
pub mod store;
pub mod summary;
pub mod transcript;

pub use audio::{
    AudioCaptureSession, AudioChunk, AudioFrame, AudioSource, CaptureBackend,
    CaptureBackendFactory, CaptureConfig, CaptureError,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use recognize::{
    ModelLoader, ModelReadiness, ModelTier, RecognitionModel, RecognizeError, Recognizer,
};
pub use session::{SessionConfig, SessionError, SessionState, SessionStats, TranscriptionSession};
pub use store::{Meeting, StorageHealth, StoreError, TranscriptionStore};
pub use summary::{SummaryClient, SummaryError, SummaryRequest, TextGenerator};
pub use transcript::TranscriptAccumulator;
