//! Observability monitoring engine -- audit run queue, single background
//! worker, bounded run history, and monitoring state snapshots.

mod engine;
pub mod history;
pub mod queue;
pub mod simulate;

pub use history::{HistoryEntry, HistoryStore, HISTORY_LIMIT};
pub use queue::{Device, QueueEntry, QueueStatus, QueuedRun, RunRequest, Trigger};
pub use simulate::{AxeSummary, Metrics, RunStatus, SimulatedAudit};

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// Completed runs exposed in monitoring state, most recent first.
const RECENT_RUNS: usize = 5;
/// Completed runs sampled for the rolling summary.
const SUMMARY_WINDOW: usize = 5;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("run {id} left the queue before completing")]
    RunAbandoned { id: Uuid },
}

/// Static audit target surfaced in monitoring state for the dashboard.
/// Immutable configuration; never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTarget {
    pub id: String,
    pub label: String,
    pub url: String,
    pub device: Device,
    pub cadence: String,
}

/// The built-in audit target list.
pub fn default_targets() -> Vec<AuditTarget> {
    [
        ("home-desktop", "Homepage - desktop", "/", Device::Desktop, "daily"),
        ("home-mobile", "Homepage - mobile", "/", Device::Mobile, "daily"),
        (
            "pricing-desktop",
            "Pricing - desktop",
            "/pricing",
            Device::Desktop,
            "every 2 days",
        ),
        (
            "local-mobile",
            "Local intent - mobile",
            "/locaties/eindhoven",
            Device::Mobile,
            "weekly",
        ),
    ]
    .into_iter()
    .map(|(id, label, url, device, cadence)| AuditTarget {
        id: id.to_string(),
        label: label.to_string(),
        url: url.to_string(),
        device,
        cadence: cadence.to_string(),
    })
    .collect()
}

/// Runtime settings for the monitoring engine.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub history_path: PathBuf,
    pub run_delay: Duration,
    pub targets: Vec<AuditTarget>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("data/performance-monitoring.json"),
            run_delay: Duration::from_millis(25),
            targets: default_targets(),
        }
    }
}

struct Inner {
    queue: VecDeque<QueueEntry>,
    history: HistoryStore,
}

/// The monitoring engine. Owns the run queue and history exclusively; one
/// worker task is spawned at construction and lives as long as the engine.
pub struct Monitor {
    inner: Arc<Mutex<Inner>>,
    wake: mpsc::UnboundedSender<()>,
    targets: Vec<AuditTarget>,
}

impl Monitor {
    /// Restore persisted history and start the worker task.
    pub async fn new(config: MonitorConfig) -> Self {
        let history = HistoryStore::load(config.history_path).await;
        let inner = Arc::new(Mutex::new(Inner {
            queue: VecDeque::new(),
            history,
        }));

        let (wake, wake_rx) = mpsc::unbounded_channel();
        tokio::spawn(engine::run_worker(inner.clone(), wake_rx, config.run_delay));

        Self {
            inner,
            wake,
            targets: config.targets,
        }
    }

    /// Normalize and enqueue an audit run, returning the queued entry
    /// immediately. The worker picks it up asynchronously; the pending queue
    /// is unbounded.
    pub async fn schedule_run(&self, request: RunRequest) -> QueueEntry {
        let entry = QueueEntry::from_request(request, Utc::now());
        {
            let mut state = self.inner.lock().await;
            state.queue.push_back(entry.clone());
        }
        debug!(run = %entry.id, url = %entry.url, "audit run queued");

        // A closed channel means the engine is shutting down; the entry
        // stays queued and is simply never processed.
        let _ = self.wake.send(());
        entry
    }

    /// Read-only snapshot: pending queue, recent runs, configured targets,
    /// and the rolling summary.
    pub async fn monitoring_state(&self) -> MonitoringState {
        let state = self.inner.lock().await;
        MonitoringState {
            updated_at: state.history.updated_at(),
            queue: state.queue.iter().map(QueuedRun::from).collect(),
            runs: state.history.recent(RECENT_RUNS),
            targets: self.targets.clone(),
            summary: compute_summary(&state.history),
        }
    }

    /// Health probe.
    pub async fn ping(&self) -> Ping {
        let state = self.inner.lock().await;
        Ping {
            ok: true,
            queue_size: state.queue.len(),
            history_size: state.history.len(),
            last_updated: state.history.updated_at(),
        }
    }

    /// Test-only teardown: clears the queue and in-memory history. The
    /// on-disk history file is untouched.
    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        state.queue.clear();
        state.history.reset();
    }
}

/// Snapshot returned by [`Monitor::monitoring_state`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringState {
    pub updated_at: Option<DateTime<Utc>>,
    pub queue: Vec<QueuedRun>,
    pub runs: Vec<HistoryEntry>,
    pub targets: Vec<AuditTarget>,
    pub summary: Summary,
}

/// Rolling summary over the most recent completed runs.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub last_run_at: Option<DateTime<Utc>>,
    pub average_scores: Option<Metrics>,
    pub degraded_runs: usize,
}

/// Health check payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ping {
    pub ok: bool,
    pub queue_size: usize,
    pub history_size: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

fn compute_summary(history: &HistoryStore) -> Summary {
    if history.is_empty() {
        return Summary {
            last_run_at: history.updated_at(),
            average_scores: None,
            degraded_runs: 0,
        };
    }

    let entries = history.entries();
    let recent = &entries[entries.len().saturating_sub(SUMMARY_WINDOW)..];

    let mut sums = [0u64; 4];
    let mut samples = 0u64;
    let mut degraded = 0usize;
    for run in recent {
        if let Some(metrics) = &run.metrics {
            sums[0] += u64::from(metrics.performance);
            sums[1] += u64::from(metrics.accessibility);
            sums[2] += u64::from(metrics.best_practices);
            sums[3] += u64::from(metrics.seo);
            samples += 1;
        }
        if matches!(run.status, RunStatus::Degraded | RunStatus::Attention) {
            degraded += 1;
        }
    }

    let average_scores = (samples > 0).then(|| Metrics {
        performance: average(sums[0], samples),
        accessibility: average(sums[1], samples),
        best_practices: average(sums[2], samples),
        seo: average(sums[3], samples),
    });

    Summary {
        last_run_at: history.updated_at(),
        average_scores,
        degraded_runs: degraded,
    }
}

fn average(sum: u64, samples: u64) -> u32 {
    (sum as f64 / samples as f64).round() as u32
}
