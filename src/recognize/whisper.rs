use std::path::Path;
use std::sync::Arc;

use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::artifacts::ArtifactCache;
use super::recognizer::{ModelLoader, RecognitionModel, RecognizeError};
use super::tier::ModelTier;

/// whisper.cpp-backed recognition model.
pub struct WhisperSpeechModel {
    ctx: WhisperContext,
    tier: ModelTier,
    n_threads: i32,
}

impl WhisperSpeechModel {
    pub fn load(path: &Path, tier: ModelTier) -> Result<Self, RecognizeError> {
        info!("Loading whisper {} model from {:?}", tier, path);

        let path = path.to_str().ok_or_else(|| {
            RecognizeError::ModelUnavailable("model path is not valid UTF-8".to_string())
        })?;

        let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| {
                RecognizeError::ModelUnavailable(format!("failed to load model: {}", e))
            })?;

        let n_threads = std::thread::available_parallelism()
            .map(|p| (p.get() as i32).max(1))
            .unwrap_or(4);

        Ok(Self {
            ctx,
            tier,
            n_threads,
        })
    }
}

impl RecognitionModel for WhisperSpeechModel {
    fn model_id(&self) -> String {
        format!("whisper-{}", self.tier)
    }

    fn transcribe(&self, samples: &[f32]) -> Result<String, RecognizeError> {
        // Greedy sampling; beam search is 2-3x slower.
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_n_threads(self.n_threads);

        // Chunks are short; a single segment decodes faster.
        if (samples.len() as f32 / 16_000.0) < 30.0 {
            params.set_single_segment(true);
        }

        params.set_token_timestamps(false);

        // Thresholds that keep silence and background noise from
        // turning into hallucinated text.
        params.set_no_speech_thold(0.6);
        params.set_entropy_thold(2.4);
        params.set_logprob_thold(-1.0);
        params.set_temperature(0.0);
        params.set_temperature_inc(0.2);
        params.set_no_context(true);
        params.set_suppress_non_speech_tokens(true);

        params.set_language(Some("auto"));
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);

        let mut state = self.ctx.create_state().map_err(|e| {
            RecognizeError::InferenceFailed(format!("failed to create state: {}", e))
        })?;

        state
            .full(params, samples)
            .map_err(|e| RecognizeError::InferenceFailed(format!("inference failed: {}", e)))?;

        let num_segments = state.full_n_segments().map_err(|e| {
            RecognizeError::InferenceFailed(format!("failed to get segments: {}", e))
        })?;

        let mut text = String::new();

        for i in 0..num_segments {
            let segment = state.full_get_segment_text(i).map_err(|e| {
                RecognizeError::InferenceFailed(format!("failed to get segment text: {}", e))
            })?;

            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(segment);
        }

        Ok(text)
    }
}

/// Loads whisper models from the artifact cache.
pub struct WhisperLoader {
    cache: ArtifactCache,
}

impl WhisperLoader {
    pub fn new(cache: ArtifactCache) -> Self {
        Self { cache }
    }
}

#[async_trait::async_trait]
impl ModelLoader for WhisperLoader {
    async fn load(&self, tier: ModelTier) -> Result<Arc<dyn RecognitionModel>, RecognizeError> {
        let path = self.cache.ensure(tier).await?;

        // Model init parses the whole artifact; keep it off the runtime.
        let model = tokio::task::spawn_blocking(move || WhisperSpeechModel::load(&path, tier))
            .await
            .map_err(|e| {
                RecognizeError::ModelUnavailable(format!("model load task panicked: {}", e))
            })??;

        Ok(Arc::new(model))
    }
}
