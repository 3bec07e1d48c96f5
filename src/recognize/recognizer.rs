use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::tier::ModelTier;
use crate::audio::decode_chunk;

/// Errors from model loading and chunk recognition.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecognizeError {
    /// The model artifact could not be fetched or initialized.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model is resident but failed on this chunk.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// No model for this tier is resident.
    #[error("model {0} is not loaded")]
    ModelNotLoaded(ModelTier),
}

/// Lifecycle of a tier's model within this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelReadiness {
    NotLoaded,
    Loading,
    Ready,
    Failed,
}

/// A loaded speech recognition model.
///
/// Implementations run inference synchronously; the [`Recognizer`]
/// moves that work onto a blocking thread.
pub trait RecognitionModel: Send + Sync {
    /// Identifier for logs and status reporting, e.g. `whisper-base`.
    fn model_id(&self) -> String;

    /// Transcribe 16kHz mono PCM samples.
    fn transcribe(&self, samples: &[f32]) -> Result<String, RecognizeError>;
}

/// Source of models, keyed by tier.
#[async_trait::async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, tier: ModelTier) -> Result<Arc<dyn RecognitionModel>, RecognizeError>;
}

/// Placeholder loader for builds without a recognition backend.
pub struct UnsupportedLoader;

#[async_trait::async_trait]
impl ModelLoader for UnsupportedLoader {
    async fn load(&self, _tier: ModelTier) -> Result<Arc<dyn RecognitionModel>, RecognizeError> {
        Err(RecognizeError::ModelUnavailable(
            "no speech recognition backend compiled in; rebuild with --features whisper"
                .to_string(),
        ))
    }
}

#[derive(Clone)]
struct ResidentEntry {
    tier: ModelTier,
    model: Arc<dyn RecognitionModel>,
}

type SharedLoad = Shared<BoxFuture<'static, Result<ResidentEntry, RecognizeError>>>;

struct Inner {
    resident: Option<ResidentEntry>,
    in_flight: HashMap<ModelTier, SharedLoad>,
    failed: HashMap<ModelTier, String>,
}

/// Speech recognition front end.
///
/// Keeps at most one resident model, coalesces concurrent loads for the
/// same tier into a single underlying load, and serializes inference so
/// the backend only ever sees one chunk at a time.
pub struct Recognizer {
    loader: Arc<dyn ModelLoader>,
    inner: Mutex<Inner>,
    infer_lock: Mutex<()>,
}

impl Recognizer {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            inner: Mutex::new(Inner {
                resident: None,
                in_flight: HashMap::new(),
                failed: HashMap::new(),
            }),
            infer_lock: Mutex::new(()),
        }
    }

    /// Load a tier's model if it is not already resident.
    ///
    /// Loading a different tier replaces the previous resident model.
    pub async fn ensure_loaded(&self, tier: ModelTier) -> Result<(), RecognizeError> {
        let load = {
            let mut inner = self.inner.lock().await;

            if inner.resident.as_ref().map(|r| r.tier) == Some(tier) {
                return Ok(());
            }

            if let Some(load) = inner.in_flight.get(&tier) {
                load.clone()
            } else {
                let loader = Arc::clone(&self.loader);
                let load: SharedLoad = async move {
                    let model = loader.load(tier).await?;
                    Ok(ResidentEntry { tier, model })
                }
                .boxed()
                .shared();
                inner.in_flight.insert(tier, load.clone());
                inner.failed.remove(&tier);
                info!("Loading {} model", tier);
                load
            }
        };

        let result = load.await;

        let mut inner = self.inner.lock().await;
        // Only the first waiter back installs the result. Later waiters
        // of the same load would clobber a newer tier that finished in
        // the meantime.
        if inner.in_flight.remove(&tier).is_some() {
            match &result {
                Ok(entry) => {
                    if let Some(previous) = inner.resident.replace(entry.clone()) {
                        if previous.tier != tier {
                            info!("Evicted {} model in favor of {}", previous.tier, tier);
                        }
                    }
                    inner.failed.remove(&tier);
                    info!("Model {} ready ({})", tier, entry.model.model_id());
                }
                Err(e) => {
                    inner.failed.insert(tier, e.to_string());
                    warn!("Model {} failed to load: {}", tier, e);
                }
            }
        }

        result.map(|_| ())
    }

    /// Report where a tier's model stands without triggering a load.
    pub async fn readiness(&self, tier: ModelTier) -> ModelReadiness {
        let inner = self.inner.lock().await;
        if inner.resident.as_ref().map(|r| r.tier) == Some(tier) {
            ModelReadiness::Ready
        } else if inner.in_flight.contains_key(&tier) {
            ModelReadiness::Loading
        } else if inner.failed.contains_key(&tier) {
            ModelReadiness::Failed
        } else {
            ModelReadiness::NotLoaded
        }
    }

    /// Failure message from the most recent load attempt, if it failed.
    pub async fn failure(&self, tier: ModelTier) -> Option<String> {
        self.inner.lock().await.failed.get(&tier).cloned()
    }

    /// Identifier of the currently resident model, if any.
    pub async fn resident_model_id(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.resident.as_ref().map(|r| r.model.model_id())
    }

    /// Decode a WAV chunk and transcribe it with the resident model.
    ///
    /// Requires the tier's model to already be resident; recognition
    /// never triggers a load on its own.
    pub async fn transcribe_chunk(
        &self,
        tier: ModelTier,
        chunk: Vec<u8>,
    ) -> Result<String, RecognizeError> {
        let model = {
            let inner = self.inner.lock().await;
            match &inner.resident {
                Some(entry) if entry.tier == tier => Arc::clone(&entry.model),
                _ => return Err(RecognizeError::ModelNotLoaded(tier)),
            }
        };

        let _inference = self.infer_lock.lock().await;

        let text = tokio::task::spawn_blocking(move || {
            let samples = decode_chunk(chunk)
                .map_err(|e| RecognizeError::InferenceFailed(e.to_string()))?;
            model.transcribe(&samples)
        })
        .await
        .map_err(|e| RecognizeError::InferenceFailed(format!("inference task panicked: {}", e)))??;

        Ok(text.trim().to_string())
    }
}
