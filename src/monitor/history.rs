//! Bounded on-disk history of completed audit runs.
//!
//! The history is a ring buffer of the last [`HISTORY_LIMIT`] runs backed by
//! a single pretty-printed JSON file. Durability is best-effort: a failed
//! write is logged and the in-memory list stays authoritative.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, error, warn};

use super::queue::{Device, QueueEntry, Trigger};
use super::simulate::{AxeSummary, Metrics, RunStatus, SimulatedAudit};

/// Maximum number of completed runs retained, oldest dropped first.
pub const HISTORY_LIMIT: usize = 50;

/// A completed audit run. Immutable once appended.
///
/// Timestamps and metrics are optional to tolerate records written by older
/// builds; the legacy `createdAt` and `scores` spellings are accepted on
/// load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default)]
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: RunStatus,
    #[serde(default, alias = "createdAt")]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "scores")]
    pub metrics: Option<Metrics>,
    #[serde(default)]
    pub axe: Option<AxeSummary>,
}

fn default_status() -> RunStatus {
    RunStatus::Passed
}

impl HistoryEntry {
    /// Materialize a completed run from its queue entry and simulated audit.
    pub fn from_run(entry: QueueEntry, audit: SimulatedAudit, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: entry.id.to_string(),
            url: entry.url,
            device: entry.device,
            trigger: entry.trigger,
            tools: entry.tools,
            variant_id: entry.variant_id,
            status: audit.status,
            requested_at: Some(entry.requested_at),
            started_at: entry.started_at,
            completed_at: Some(completed_at),
            metrics: Some(audit.metrics),
            axe: Some(audit.axe),
        }
    }
}

/// On-disk layout: `{ "updatedAt": ..., "history": [...] }`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryFile {
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

/// Bounded, file-backed list of completed runs.
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
    updated_at: Option<DateTime<Utc>>,
}

impl HistoryStore {
    /// Restore the store from disk. A missing or unparsable file is not an
    /// error; the store starts empty.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut store = Self {
            path,
            entries: Vec::new(),
            updated_at: None,
        };

        let raw = match fs::read(&store.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = %store.path.display(), "no run history on disk, starting empty");
                return store;
            }
            Err(error) => {
                warn!(%error, path = %store.path.display(), "failed to restore run history");
                return store;
            }
        };

        match serde_json::from_slice::<HistoryFile>(&raw) {
            Ok(file) => {
                store.updated_at = file.updated_at;
                store.entries = file.history;
                let excess = store.entries.len().saturating_sub(HISTORY_LIMIT);
                if excess > 0 {
                    store.entries.drain(..excess);
                }
            }
            Err(error) => {
                warn!(%error, path = %store.path.display(), "run history unparsable, starting empty");
            }
        }

        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// The last `count` entries, most recent first.
    pub fn recent(&self, count: usize) -> Vec<HistoryEntry> {
        self.entries.iter().rev().take(count).cloned().collect()
    }

    /// Append one completed run, dropping from the front past capacity.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
        let excess = self.entries.len().saturating_sub(HISTORY_LIMIT);
        if excess > 0 {
            self.entries.drain(..excess);
        }
    }

    /// Advance the last-updated stamp recorded alongside the history.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }

    /// Write the current state to disk. Failures are logged and swallowed;
    /// the in-memory history remains correct either way.
    pub async fn persist(&self) {
        let payload = HistoryFile {
            updated_at: self.updated_at,
            history: self.entries.clone(),
        };
        let bytes = match serde_json::to_vec_pretty(&payload) {
            Ok(bytes) => bytes,
            Err(error) => {
                error!(%error, "failed to serialize run history");
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            if let Err(error) = fs::create_dir_all(parent).await {
                error!(%error, path = %self.path.display(), "failed to create history directory");
                return;
            }
        }
        if let Err(error) = fs::write(&self.path, bytes).await {
            error!(%error, path = %self.path.display(), "failed to persist run history");
        }
    }

    /// Clear in-memory state for test isolation. The on-disk file is kept.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.updated_at = None;
    }
}
