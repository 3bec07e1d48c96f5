// Speech recognition: tiered model loading and chunk transcription.

pub mod artifacts;
pub mod recognizer;
pub mod tier;

#[cfg(feature = "whisper")]
pub mod whisper;

use std::path::Path;
use std::sync::Arc;

pub use artifacts::ArtifactCache;
pub use recognizer::{
    ModelLoader, ModelReadiness, RecognitionModel, RecognizeError, Recognizer, UnsupportedLoader,
};
pub use tier::ModelTier;

/// Build the model loader for this binary's compiled features.
#[cfg(feature = "whisper")]
pub fn default_loader(cache_dir: &Path, artifact_base_url: &str) -> Arc<dyn ModelLoader> {
    Arc::new(whisper::WhisperLoader::new(ArtifactCache::new(
        cache_dir,
        artifact_base_url,
    )))
}

/// Build the model loader for this binary's compiled features.
#[cfg(not(feature = "whisper"))]
pub fn default_loader(_cache_dir: &Path, _artifact_base_url: &str) -> Arc<dyn ModelLoader> {
    Arc::new(UnsupportedLoader)
}
