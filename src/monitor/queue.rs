//! Run request normalization and queue entry types.
//!
//! Malformed or partial requests are defaulted rather than rejected so the
//! audit pipeline stays permissive towards its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tools attached to a run when the caller names none.
pub const DEFAULT_TOOLS: [&str; 2] = ["lighthouse", "axe"];

/// Device profile an audit is simulated for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Desktop,
    Mobile,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Desktop => "desktop",
            Device::Mobile => "mobile",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a run to be scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    #[default]
    Manual,
    Dashboard,
    Scheduled,
}

/// Lifecycle state of an entry while resident in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Queued,
    Running,
}

/// Caller-facing request for `schedule_run`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunRequest {
    pub url: Option<String>,
    pub device: Option<Device>,
    pub variant_id: Option<String>,
    pub trigger: Option<Trigger>,
    pub tools: Option<Vec<String>>,
}

/// A requested-but-not-yet-completed audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: Uuid,
    pub url: String,
    pub device: Device,
    pub trigger: Trigger,
    pub tools: Vec<String>,
    pub variant_id: Option<String>,
    pub status: QueueStatus,
    pub requested_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    /// Normalize a raw request into a queued entry. Ids are unique for the
    /// lifetime of the process.
    pub fn from_request(request: RunRequest, requested_at: DateTime<Utc>) -> Self {
        let tools = match request.tools {
            Some(tools) if !tools.is_empty() => tools,
            _ => DEFAULT_TOOLS.iter().map(|tool| tool.to_string()).collect(),
        };

        Self {
            id: Uuid::new_v4(),
            url: request
                .url
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| "/".to_string()),
            device: request.device.unwrap_or_default(),
            trigger: request.trigger.unwrap_or_default(),
            tools,
            variant_id: request.variant_id.filter(|id| !id.is_empty()),
            status: QueueStatus::Queued,
            requested_at,
            started_at: None,
        }
    }
}

/// Public projection of a queue entry for monitoring state. Tool selection
/// and worker timing stay internal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRun {
    pub id: Uuid,
    pub url: String,
    pub device: Device,
    pub status: QueueStatus,
    pub trigger: Trigger,
    pub requested_at: DateTime<Utc>,
    pub variant_id: Option<String>,
}

impl From<&QueueEntry> for QueuedRun {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            id: entry.id,
            url: entry.url.clone(),
            device: entry.device,
            status: entry.status,
            trigger: entry.trigger,
            requested_at: entry.requested_at,
            variant_id: entry.variant_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_is_fully_defaulted() {
        let entry = QueueEntry::from_request(RunRequest::default(), Utc::now());

        assert_eq!(entry.url, "/");
        assert_eq!(entry.device, Device::Desktop);
        assert_eq!(entry.trigger, Trigger::Manual);
        assert_eq!(entry.tools, vec!["lighthouse", "axe"]);
        assert_eq!(entry.variant_id, None);
        assert_eq!(entry.status, QueueStatus::Queued);
        assert!(entry.started_at.is_none());
    }

    #[test]
    fn empty_tool_list_falls_back_to_defaults() {
        let request = RunRequest {
            tools: Some(Vec::new()),
            ..RunRequest::default()
        };
        let entry = QueueEntry::from_request(request, Utc::now());
        assert_eq!(entry.tools, vec!["lighthouse", "axe"]);
    }

    #[test]
    fn explicit_fields_are_preserved() {
        let request = RunRequest {
            url: Some("/pricing".into()),
            device: Some(Device::Mobile),
            variant_id: Some("romantic_wedding".into()),
            trigger: Some(Trigger::Dashboard),
            tools: Some(vec!["lighthouse".into()]),
        };
        let entry = QueueEntry::from_request(request, Utc::now());

        assert_eq!(entry.url, "/pricing");
        assert_eq!(entry.device, Device::Mobile);
        assert_eq!(entry.variant_id.as_deref(), Some("romantic_wedding"));
        assert_eq!(entry.trigger, Trigger::Dashboard);
        assert_eq!(entry.tools, vec!["lighthouse"]);
    }

    #[test]
    fn empty_variant_id_is_treated_as_absent() {
        let request = RunRequest {
            variant_id: Some(String::new()),
            ..RunRequest::default()
        };
        let entry = QueueEntry::from_request(request, Utc::now());
        assert_eq!(entry.variant_id, None);
    }

    #[test]
    fn ids_are_unique_per_entry() {
        let a = QueueEntry::from_request(RunRequest::default(), Utc::now());
        let b = QueueEntry::from_request(RunRequest::default(), Utc::now());
        assert_ne!(a.id, b.id);
    }
}
