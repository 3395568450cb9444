//! Single-consumer worker that drains the audit run queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use super::history::HistoryEntry;
use super::queue::{QueueEntry, QueueStatus};
use super::simulate::simulate;
use super::{Inner, MonitorError};

/// Long-lived worker loop. Exactly one runs per engine instance, so at most
/// one entry is ever `running` and history writes never race.
pub(super) async fn run_worker(
    inner: Arc<Mutex<Inner>>,
    mut wake: mpsc::UnboundedReceiver<()>,
    run_delay: Duration,
) {
    info!("monitor worker started");
    while wake.recv().await.is_some() {
        drain(&inner, run_delay).await;
    }
    debug!("monitor worker stopped");
}

/// Process queued entries head-first until the queue is empty. A failure
/// drops that run and moves on; the loop itself never aborts.
async fn drain(inner: &Mutex<Inner>, run_delay: Duration) {
    loop {
        let entry = {
            let mut state = inner.lock().await;
            let Some(head) = state.queue.front_mut() else {
                break;
            };
            head.status = QueueStatus::Running;
            head.started_at = Some(Utc::now());
            head.clone()
        };

        let id = entry.id;
        if let Err(error) = process(inner, entry, run_delay).await {
            error!(%error, run = %id, "audit run failed, dropping run");
        }
    }
}

async fn process(
    inner: &Mutex<Inner>,
    entry: QueueEntry,
    run_delay: Duration,
) -> Result<(), MonitorError> {
    // Model non-instant audit work; keeps polling dashboards honest.
    if !run_delay.is_zero() {
        tokio::time::sleep(run_delay).await;
    }

    let completed_at = Utc::now();
    let audit = simulate(&entry, completed_at);

    let mut state = inner.lock().await;
    if state.queue.front().map(|head| head.id) != Some(entry.id) {
        // reset() raced us while the simulated work was in flight.
        return Err(MonitorError::RunAbandoned { id: entry.id });
    }
    state.queue.pop_front();

    let completed = HistoryEntry::from_run(entry, audit, completed_at);
    info!(
        run = %completed.id,
        url = %completed.url,
        status = ?completed.status,
        "audit run completed"
    );
    state.history.append(completed);
    state.history.touch(completed_at);
    state.history.persist().await;

    Ok(())
}
