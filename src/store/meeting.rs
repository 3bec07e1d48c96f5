use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved meeting transcription.
///
/// The serialized field names match the export payload format, so a
/// store file can be imported as-is on another machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub participants: Vec<String>,
    #[serde(rename = "markdownSummary", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Meeting {
    /// Create a meeting record from a finished transcript.
    pub fn new(text: impl Into<String>, participants: Vec<String>) -> Self {
        Self {
            id: format!("meeting-{}", Uuid::new_v4()),
            text: text.into(),
            timestamp: Utc::now(),
            participants: dedupe_participants(participants),
            summary: None,
        }
    }
}

/// Drop blank names and duplicates, keeping first-occurrence order.
pub(crate) fn dedupe_participants(participants: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    participants
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// Unvalidated shape of one record in an import payload.
///
/// Imports come from files users may have edited by hand, so every
/// field is optional here and checked explicitly in [`validate`].
///
/// [`validate`]: RawMeetingRecord::validate
#[derive(Debug, Deserialize)]
pub(crate) struct RawMeetingRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub participants: Option<serde_json::Value>,
    #[serde(default, rename = "markdownSummary")]
    pub summary: Option<String>,
}

impl RawMeetingRecord {
    /// Check required fields and produce a well-formed [`Meeting`].
    ///
    /// A participants field that is not an array of strings is treated
    /// as absent rather than rejecting the record.
    pub(crate) fn validate(self) -> Result<Meeting, String> {
        let id = self.id.unwrap_or_default();
        let text = self.text.unwrap_or_default();
        let timestamp = self.timestamp.unwrap_or_default();

        if id.is_empty() || text.is_empty() || timestamp.is_empty() {
            return Err("missing required fields (id, text, timestamp)".to_string());
        }

        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| format!("invalid timestamp on {}: {}", id, e))?
            .with_timezone(&Utc);

        let participants = match self.participants {
            Some(value) => serde_json::from_value::<Vec<String>>(value).unwrap_or_default(),
            None => Vec::new(),
        };

        Ok(Meeting {
            id,
            text,
            timestamp,
            participants: dedupe_participants(participants),
            summary: self.summary,
        })
    }
}
