use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::meeting::{Meeting, RawMeetingRecord};

/// Errors from the transcription store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("meeting {0} already exists")]
    DuplicateId(String),

    #[error("invalid import format: {0}")]
    InvalidImportFormat(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Whether saved meetings survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageHealth {
    Persistent,
    MemoryOnly,
}

/// Result of merging an exported payload into the store.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
}

struct StoreState {
    meetings: Vec<Meeting>,
    health: StorageHealth,
}

/// Saved meeting transcriptions, newest first, backed by a JSON file.
///
/// Opening never fails: if the backing path cannot be written the store
/// runs memory-only and says so, and every later operation keeps
/// working against the in-memory list.
pub struct TranscriptionStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl TranscriptionStore {
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let health = match Self::probe(&path).await {
            Ok(()) => StorageHealth::Persistent,
            Err(e) => {
                warn!(
                    "Storage probe failed, meetings will not survive a restart: {}",
                    e
                );
                StorageHealth::MemoryOnly
            }
        };

        let meetings = if health == StorageHealth::Persistent {
            Self::load_existing(&path).await
        } else {
            Vec::new()
        };

        info!(
            "Transcription store opened at {:?} ({} saved meetings)",
            path,
            meetings.len()
        );

        Self {
            path,
            state: RwLock::new(StoreState { meetings, health }),
        }
    }

    /// Write and delete a probe file to prove the path is usable.
    async fn probe(path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let probe = path.with_file_name(".storage-probe");
        tokio::fs::write(&probe, b"probe").await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }

    /// Load the saved list, treating a corrupt file as empty.
    ///
    /// A corrupt file does not flip the store to memory-only; the path
    /// is still writable and the next save replaces it.
    async fn load_existing(path: &Path) -> Vec<Meeting> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read saved meetings, starting empty: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Meeting>>(&raw) {
            Ok(meetings) => meetings,
            Err(e) => {
                warn!("Saved meetings file is corrupt, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn health(&self) -> StorageHealth {
        self.state.read().await.health
    }

    /// Current list of saved meetings, newest first.
    pub async fn list(&self) -> Vec<Meeting> {
        self.state.read().await.meetings.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Meeting> {
        self.state
            .read()
            .await
            .meetings
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    /// Add a new meeting at the front of the list and persist.
    pub async fn save(&self, meeting: Meeting) -> Result<Meeting, StoreError> {
        let mut state = self.state.write().await;

        if state.meetings.iter().any(|m| m.id == meeting.id) {
            return Err(StoreError::DuplicateId(meeting.id));
        }

        state.meetings.insert(0, meeting.clone());
        self.persist(&mut state).await;

        info!("Saved meeting {} ({} chars)", meeting.id, meeting.text.len());
        Ok(meeting)
    }

    /// Remove one meeting by id. Removing an absent id changes nothing.
    ///
    /// Returns whether a meeting was actually removed.
    pub async fn delete(&self, id: &str) -> bool {
        let mut state = self.state.write().await;

        let before = state.meetings.len();
        state.meetings.retain(|m| m.id != id);
        if state.meetings.len() == before {
            return false;
        }

        self.persist(&mut state).await;
        info!("Deleted meeting {}", id);
        true
    }

    /// Remove every saved meeting along with the backing file.
    pub async fn clear_all(&self) -> usize {
        let mut state = self.state.write().await;

        let removed = state.meetings.len();
        state.meetings.clear();

        if state.health == StorageHealth::Persistent {
            if let Err(e) = tokio::fs::remove_file(&self.path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove storage file: {}", e);
                }
            }
        }

        info!("Cleared {} saved meetings", removed);
        removed
    }

    /// Attach a generated summary to a saved meeting.
    ///
    /// Returns the updated meeting, or `None` when the id is no longer
    /// present (the meeting was deleted while the summary was produced).
    pub async fn update_summary(&self, id: &str, summary: String) -> Option<Meeting> {
        let mut state = self.state.write().await;

        let meeting = state.meetings.iter_mut().find(|m| m.id == id)?;
        meeting.summary = Some(summary);
        let updated = meeting.clone();

        self.persist(&mut state).await;
        Some(updated)
    }

    /// Serialize every saved meeting as pretty-printed JSON.
    pub async fn export_all(&self) -> Result<String, StoreError> {
        let state = self.state.read().await;
        Ok(serde_json::to_string_pretty(&state.meetings)?)
    }

    /// Merge an exported payload into the store.
    ///
    /// The whole payload is validated before anything is admitted: one
    /// malformed record rejects the entire import. Records whose id is
    /// already present (in the store or earlier in the payload) are
    /// skipped, and admitted records keep their payload order at the
    /// front of the list.
    pub async fn import_merge(&self, payload: &str) -> Result<ImportOutcome, StoreError> {
        let value: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| StoreError::InvalidImportFormat(format!("not valid JSON: {}", e)))?;

        let records = match value {
            serde_json::Value::Array(records) => records,
            _ => {
                return Err(StoreError::InvalidImportFormat(
                    "expected an array of meetings".to_string(),
                ))
            }
        };

        let mut incoming = Vec::with_capacity(records.len());
        for record in records {
            let raw: RawMeetingRecord = serde_json::from_value(record)
                .map_err(|e| StoreError::InvalidImportFormat(e.to_string()))?;
            incoming.push(raw.validate().map_err(StoreError::InvalidImportFormat)?);
        }

        let mut state = self.state.write().await;

        let total = incoming.len();
        let mut seen: HashSet<String> = state.meetings.iter().map(|m| m.id.clone()).collect();
        let mut admitted: Vec<Meeting> = incoming
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .collect();

        let outcome = ImportOutcome {
            imported: admitted.len(),
            skipped: total - admitted.len(),
        };

        if !admitted.is_empty() {
            let existing = std::mem::take(&mut state.meetings);
            admitted.extend(existing);
            state.meetings = admitted;
            self.persist(&mut state).await;
        }

        info!(
            "Imported {} meetings, skipped {} duplicates",
            outcome.imported, outcome.skipped
        );
        Ok(outcome)
    }

    /// Write the list to disk, degrading to memory-only on failure.
    ///
    /// Write failures are not surfaced to the caller: the in-memory
    /// list is already updated and stays authoritative.
    async fn persist(&self, state: &mut StoreState) {
        if state.health == StorageHealth::MemoryOnly {
            return;
        }

        let json = match serde_json::to_string_pretty(&state.meetings) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize meetings: {}", e);
                return;
            }
        };

        let temp = self.path.with_extension("json.tmp");
        let result = async {
            tokio::fs::write(&temp, &json).await?;
            tokio::fs::rename(&temp, &self.path).await
        }
        .await;

        if let Err(e) = result {
            warn!(
                "Storage became unavailable, keeping meetings in memory only: {}",
                e
            );
            state.health = StorageHealth::MemoryOnly;
        }
    }
}
