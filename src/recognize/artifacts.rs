use super::tier::ModelTier;
use super::RecognizeError;
use std::path::PathBuf;
use tracing::info;

/// Local cache of downloaded model artifacts.
///
/// Artifacts are fetched once per tier and kept under the cache
/// directory. Bytes are written to a `.tmp` file and renamed on
/// completion, so a file at the final path is always complete.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
    base_url: String,
    client: reqwest::Client,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Path where a tier's artifact lives once cached.
    pub fn artifact_path(&self, tier: ModelTier) -> PathBuf {
        self.dir.join(tier.artifact_filename())
    }

    /// Check if a tier's artifact is already cached.
    pub fn is_cached(&self, tier: ModelTier) -> bool {
        self.artifact_path(tier).exists()
    }

    /// Ensure a tier's artifact is present locally, fetching it if needed.
    ///
    /// Any failure here means the model cannot be provided, which is a
    /// different condition from inference failing on a chunk.
    pub async fn ensure(&self, tier: ModelTier) -> Result<PathBuf, RecognizeError> {
        let path = self.artifact_path(tier);

        if self.is_cached(tier) {
            info!("Model {} already cached at {:?}", tier, path);
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            RecognizeError::ModelUnavailable(format!(
                "cannot create model cache directory: {}",
                e
            ))
        })?;

        let url = tier.artifact_url(&self.base_url);

        info!(
            "Downloading {} model (~{}MB) from {}",
            tier,
            tier.size_mb(),
            url
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            RecognizeError::ModelUnavailable(format!("HTTP request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(RecognizeError::ModelUnavailable(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            RecognizeError::ModelUnavailable(format!("failed to read response: {}", e))
        })?;

        let temp_path = path.with_extension("bin.tmp");

        tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
            RecognizeError::ModelUnavailable(format!("failed to write artifact: {}", e))
        })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            RecognizeError::ModelUnavailable(format!("failed to finalize artifact: {}", e))
        })?;

        info!("Model downloaded to {:?}", path);

        Ok(path)
    }
}
