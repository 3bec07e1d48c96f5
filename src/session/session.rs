use super::config::SessionConfig;
use super::stats::{SessionState, SessionStats};
use crate::audio::{
    AudioCaptureSession, AudioSource, CaptureBackendFactory, CaptureConfig, CaptureError,
};
use crate::recognize::{ModelReadiness, ModelTier, RecognizeError, Recognizer};
use crate::store::meeting::dedupe_participants;
use crate::store::{Meeting, StoreError, TranscriptionStore};
use crate::transcript::TranscriptAccumulator;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Errors from driving a transcription session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("recording is already in progress")]
    AlreadyRecording,

    #[error("model {tier} is not ready (status: {readiness:?})")]
    ModelNotReady {
        tier: ModelTier,
        readiness: ModelReadiness,
    },

    #[error("cannot save while recording is in progress")]
    StillRecording,

    #[error("transcript is empty, nothing to save")]
    EmptyTranscript,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Recognize(#[from] RecognizeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A transcription session that manages audio capture, chunk recognition,
/// and the accumulated draft transcript
pub struct TranscriptionSession {
    /// Session configuration
    config: SessionConfig,

    /// Where audio comes from
    source: AudioSource,

    /// Recognition front end shared with the HTTP layer
    recognizer: Arc<Recognizer>,

    /// Persistence for saved meetings
    store: Arc<TranscriptionStore>,

    /// Whether recording is currently active
    is_recording: AtomicBool,

    /// Bumped on every stop; recognition results from an older epoch
    /// are discarded instead of appended
    epoch: Arc<AtomicU64>,

    /// Tier used for chunks recognized from here on
    active_tier: Arc<Mutex<ModelTier>>,

    /// When the current (or most recent) recording started
    started_at: Mutex<Option<DateTime<Utc>>>,

    /// Number of chunks handed to recognition
    chunks_captured: Arc<AtomicUsize>,

    /// Number of recognized fragments appended to the draft
    fragments_recognized: Arc<AtomicUsize>,

    /// Draft transcript, kept across recordings until saved
    transcript: Arc<Mutex<TranscriptAccumulator>>,

    /// Participants attached to the next saved meeting
    participants: Mutex<Vec<String>>,

    /// Active capture session while recording
    capture: Mutex<Option<AudioCaptureSession>>,

    /// Handle for the recognition drain task
    drain_task: Mutex<Option<JoinHandle<()>>>,
}

impl TranscriptionSession {
    /// Create a new transcription session
    pub fn new(
        config: SessionConfig,
        source: AudioSource,
        recognizer: Arc<Recognizer>,
        store: Arc<TranscriptionStore>,
    ) -> Self {
        Self {
            active_tier: Arc::new(Mutex::new(config.tier)),
            config,
            source,
            recognizer,
            store,
            is_recording: AtomicBool::new(false),
            epoch: Arc::new(AtomicU64::new(0)),
            started_at: Mutex::new(None),
            chunks_captured: Arc::new(AtomicUsize::new(0)),
            fragments_recognized: Arc::new(AtomicUsize::new(0)),
            transcript: Arc::new(Mutex::new(TranscriptAccumulator::new())),
            participants: Mutex::new(Vec::new()),
            capture: Mutex::new(None),
            drain_task: Mutex::new(None),
        }
    }

    /// Start recording
    ///
    /// Recording only starts when the active tier's model is already
    /// resident; a missing model is reported, never loaded from here.
    pub async fn start(&self) -> Result<(), SessionError> {
        if self
            .is_recording
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::AlreadyRecording);
        }

        let tier = *self.active_tier.lock().await;

        let readiness = self.recognizer.readiness(tier).await;
        if readiness != ModelReadiness::Ready {
            self.is_recording.store(false, Ordering::SeqCst);
            return Err(SessionError::ModelNotReady { tier, readiness });
        }

        info!("Starting transcription session from {:?}", self.source);

        let capture_config = CaptureConfig {
            chunk_interval_ms: self.config.chunk_interval.as_millis() as u64,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            ..CaptureConfig::default()
        };

        // Create and start the capture pipeline
        let mut capture = match AudioCaptureSession::new(&self.source, capture_config) {
            Ok(capture) => capture,
            Err(e) => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        let mut chunk_rx = match capture.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        self.chunks_captured.store(0, Ordering::SeqCst);
        self.fragments_recognized.store(0, Ordering::SeqCst);
        *self.started_at.lock().await = Some(Utc::now());

        // Spawn the recognition drain task. A single consumer keeps
        // fragments in capture order.
        let recognizer = Arc::clone(&self.recognizer);
        let active_tier = Arc::clone(&self.active_tier);
        let transcript = Arc::clone(&self.transcript);
        let chunks_captured = Arc::clone(&self.chunks_captured);
        let fragments_recognized = Arc::clone(&self.fragments_recognized);
        let epoch = Arc::clone(&self.epoch);
        let session_epoch = epoch.load(Ordering::SeqCst);

        let drain_task = tokio::spawn(async move {
            info!("Recognition task started");

            while let Some(chunk) = chunk_rx.recv().await {
                // A stop may have landed while this chunk sat in the
                // queue; anything from a finished recording is dropped.
                if epoch.load(Ordering::SeqCst) != session_epoch {
                    break;
                }

                chunks_captured.fetch_add(1, Ordering::SeqCst);

                let tier = *active_tier.lock().await;
                let index = chunk.index;

                match recognizer.transcribe_chunk(tier, chunk.bytes).await {
                    Ok(text) => {
                        if epoch.load(Ordering::SeqCst) != session_epoch {
                            break;
                        }
                        if text.is_empty() {
                            continue;
                        }

                        transcript.lock().await.append(&text);
                        fragments_recognized.fetch_add(1, Ordering::SeqCst);
                        info!("Chunk {} recognized: {:?}", index, text);
                    }
                    Err(e) => {
                        warn!("Recognition failed on chunk {}: {}", index, e);
                    }
                }
            }

            info!("Recognition task stopped");
        });

        {
            let mut guard = self.capture.lock().await;
            *guard = Some(capture);
        }
        {
            let mut guard = self.drain_task.lock().await;
            *guard = Some(drain_task);
        }

        info!("Recording started");

        Ok(())
    }

    /// Stop recording, saving the draft automatically when configured
    ///
    /// Stopping always succeeds even when capture teardown is messy.
    /// Chunks still waiting in the recognition queue are discarded, so
    /// the draft only contains what was recognized before the stop.
    pub async fn stop(&self) -> Result<Option<Meeting>, SessionError> {
        if self
            .is_recording
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(None);
        }

        info!("Stopping transcription session");

        // Invalidate queued recognition results first
        self.epoch.fetch_add(1, Ordering::SeqCst);

        // Stop capture so the chunk channel closes
        if let Some(mut capture) = self.capture.lock().await.take() {
            if let Err(e) = capture.stop().await {
                warn!("Audio capture did not stop cleanly: {}", e);
            }
        }

        // Wait for the recognition task to finish
        if let Some(task) = self.drain_task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("Recognition task panicked: {}", e);
            }
        }

        info!("Recording stopped");

        if !self.config.auto_save_on_stop {
            return Ok(None);
        }

        match self.save_draft().await {
            Ok(meeting) => Ok(Some(meeting)),
            Err(SessionError::EmptyTranscript) => {
                info!("Nothing recognized, skipping save");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Save the accumulated transcript as a new meeting
    ///
    /// The draft resets only after the store accepts the meeting, and
    /// participants carry over to the next draft.
    pub async fn save_draft(&self) -> Result<Meeting, SessionError> {
        if self.is_recording.load(Ordering::SeqCst) {
            return Err(SessionError::StillRecording);
        }

        let mut transcript = self.transcript.lock().await;
        if transcript.is_empty() {
            return Err(SessionError::EmptyTranscript);
        }

        let participants = self.participants.lock().await.clone();
        let meeting = self
            .store
            .save(Meeting::new(transcript.trimmed(), participants))
            .await?;

        transcript.reset();

        info!("Draft saved as {}", meeting.id);
        Ok(meeting)
    }

    /// Switch the recognition tier, loading its model first
    ///
    /// The active tier only flips once the new model is resident.
    /// During a recording the old tier's chunks may still be queued;
    /// with its model evicted those chunks are skipped with a warning.
    pub async fn set_tier(&self, tier: ModelTier) -> Result<(), SessionError> {
        if *self.active_tier.lock().await == tier {
            return Ok(());
        }

        self.recognizer.ensure_loaded(tier).await?;
        *self.active_tier.lock().await = tier;

        info!("Recognition tier switched to {}", tier);
        Ok(())
    }

    /// Tier used for chunks recognized from here on
    pub async fn active_tier(&self) -> ModelTier {
        *self.active_tier.lock().await
    }

    /// Replace the participant list for the next saved meeting
    pub async fn set_participants(&self, participants: Vec<String>) -> Vec<String> {
        let deduped = dedupe_participants(participants);
        *self.participants.lock().await = deduped.clone();
        deduped
    }

    pub async fn participants(&self) -> Vec<String> {
        self.participants.lock().await.clone()
    }

    /// Current draft transcript
    pub async fn transcript(&self) -> String {
        self.transcript.lock().await.text().to_string()
    }

    /// Replace the draft transcript, e.g. after manual editing
    pub async fn set_transcript(&self, text: String) {
        self.transcript.lock().await.set(text);
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let recording = self.is_recording.load(Ordering::SeqCst);
        let tier = *self.active_tier.lock().await;
        let started_at = *self.started_at.lock().await;

        let duration_secs = match started_at {
            Some(started) if recording => {
                Utc::now().signed_duration_since(started).num_milliseconds() as f64 / 1000.0
            }
            _ => 0.0,
        };

        SessionStats {
            state: if recording {
                SessionState::Recording
            } else {
                SessionState::Idle
            },
            active_tier: tier,
            model_readiness: self.recognizer.readiness(tier).await,
            capture_supported: CaptureBackendFactory::is_supported(&self.source),
            started_at,
            duration_secs,
            chunks_captured: self.chunks_captured.load(Ordering::SeqCst),
            fragments_recognized: self.fragments_recognized.load(Ordering::SeqCst),
            transcript_chars: self.transcript.lock().await.text().len(),
            participants: self.participants.lock().await.clone(),
            storage: self.store.health().await,
        }
    }
}
