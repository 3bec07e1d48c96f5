use serde::Deserialize;
use serde_json::json;

use super::client::{SummaryError, TextGenerator};

/// Client for the Gemini `generateContent` REST endpoint.
///
/// The API key is read from the environment on each call rather than
/// held in memory, so it never appears in config files or debug output.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key_env: String,
}

impl GeminiGenerator {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            model: model.into(),
            api_key_env: api_key_env.into(),
        }
    }

    fn api_key(&self) -> Result<String, SummaryError> {
        std::env::var(&self.api_key_env).map_err(|_| {
            SummaryError::GenerationFailed(format!(
                "API key not configured: set {}",
                self.api_key_env
            ))
        })
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait::async_trait]
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
        let key = self.api_key()?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_base.trim_end_matches('/'),
            self.model,
            key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SummaryError::GenerationFailed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(SummaryError::GenerationFailed(format!(
                "upstream returned {}: {}",
                status, detail
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            SummaryError::GenerationFailed(format!("unreadable response: {}", e))
        })?;

        let text: String = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(SummaryError::GenerationFailed(
                "upstream returned no candidates".to_string(),
            ));
        }

        Ok(text)
    }
}
