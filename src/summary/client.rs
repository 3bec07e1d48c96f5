use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

/// Errors from summary generation.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// The transcript text was empty after trimming.
    #[error("transcript text is empty")]
    EmptyText,

    /// A summary for this meeting is already being generated.
    #[error("a summary for {0} is already being generated")]
    AlreadyInFlight(String),

    /// The upstream generator failed.
    #[error("{0}")]
    GenerationFailed(String),
}

/// Upstream text generation backend.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError>;

    /// Identifier for logs, e.g. the upstream model name.
    fn name(&self) -> &str;
}

/// Transcript text plus the participants to mention in the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub text: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

/// Builds meeting summary prompts and normalizes generator output.
///
/// At most one generation per meeting id runs at a time; a second
/// request while one is pending is rejected instead of queued.
pub struct SummaryClient {
    generator: Arc<dyn TextGenerator>,
    in_flight: Mutex<HashSet<String>>,
}

impl SummaryClient {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Generate a Markdown summary for one meeting's transcript.
    pub async fn generate_summary(
        &self,
        meeting_id: &str,
        request: &SummaryRequest,
    ) -> Result<String, SummaryError> {
        if request.text.trim().is_empty() {
            return Err(SummaryError::EmptyText);
        }

        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(meeting_id.to_string()) {
                return Err(SummaryError::AlreadyInFlight(meeting_id.to_string()));
            }
        }

        info!(
            "Generating summary for {} with {}",
            meeting_id,
            self.generator.name()
        );

        let result = self.generator.generate(&build_prompt(request)).await;

        self.in_flight.lock().await.remove(meeting_id);

        Ok(clean_summary(&result?))
    }
}

fn build_prompt(request: &SummaryRequest) -> String {
    let participant_info = if request.participants.is_empty() {
        "No specific participants were identified for this meeting.".to_string()
    } else {
        format!(
            "This meeting included {} participants: {}.",
            request.participants.len(),
            request.participants.join(", ")
        )
    };

    format!(
        r####"You are an expert meeting assistant. Your task is to create a comprehensive yet concise Markdown summary of the provided meeting transcript.

{participant_info}

Here is the meeting transcript:
{text}

Please structure your summary as follows, using Markdown:

### [Relevant Topic 1 Heading]
- Key point about topic 1
- Another key point about topic 1

### [Relevant Topic 2 Heading]
- Key point about topic 2

... (Use H3 headings for each distinct major topic discussed. Aim for clarity and conciseness.)

### Action Items
- [Action Item 1: Assigned to (if specified), Due by (if specified)]
- [Action Item 2: ...]
- (If no action items, state "No specific action items were identified.")

**Important Formatting Instructions:**
- Use H3 (###) for all section titles.
- Use bullet points (-) for lists under each section.
- Ensure the output is clean, well-formatted Markdown.
- **Always include the "### Action Items" section.**

Do NOT output JSON. Output only the Markdown summary.
"####,
        participant_info = participant_info,
        text = request.text,
    )
}

/// Strip a wrapping code fence if the model added one, then prefix the
/// plain `Summary` heading the saved format expects.
fn clean_summary(raw: &str) -> String {
    let mut cleaned = raw.trim();

    for fence in ["```markdown", "```"] {
        if let Some(rest) = cleaned.strip_prefix(fence) {
            cleaned = rest;
            if let Some(body) = cleaned.trim_end().strip_suffix("```") {
                cleaned = body;
            }
            cleaned = cleaned.trim();
            break;
        }
    }

    format!("Summary\n\n{}", cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_each_participant() {
        let prompt = build_prompt(&SummaryRequest {
            text: "we shipped it".to_string(),
            participants: vec!["Alice".to_string(), "Bob".to_string()],
        });
        assert!(prompt.contains("This meeting included 2 participants: Alice, Bob."));
        assert!(prompt.contains("we shipped it"));
    }

    #[test]
    fn prompt_notes_when_no_participants_were_identified() {
        let prompt = build_prompt(&SummaryRequest {
            text: "we shipped it".to_string(),
            participants: vec![],
        });
        assert!(prompt.contains("No specific participants were identified"));
    }

    #[test]
    fn prompt_always_demands_an_action_items_section() {
        let prompt = build_prompt(&SummaryRequest {
            text: "we shipped it".to_string(),
            participants: vec![],
        });
        assert!(prompt.contains(r####"**Always include the "### Action Items" section.**"####));
    }

    #[test]
    fn clean_strips_markdown_fences() {
        let cleaned = clean_summary("```markdown\n### Topic\n- point\n```");
        assert_eq!(cleaned, "Summary\n\n### Topic\n- point");
    }

    #[test]
    fn clean_strips_bare_fences() {
        let cleaned = clean_summary("```\n### Topic\n```");
        assert_eq!(cleaned, "Summary\n\n### Topic");
    }

    #[test]
    fn clean_leaves_unfenced_output_alone() {
        let cleaned = clean_summary("  ### Topic\n- point\n");
        assert_eq!(cleaned, "Summary\n\n### Topic\n- point");
    }

    #[test]
    fn clean_tolerates_a_missing_closing_fence() {
        let cleaned = clean_summary("```markdown\n### Topic");
        assert_eq!(cleaned, "Summary\n\n### Topic");
    }
}
