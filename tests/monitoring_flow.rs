//! End-to-end flow tests for the monitoring engine and variant analytics.

use std::time::Duration;

use sitepulse::analytics;
use sitepulse::monitor::{
    default_targets, Device, Monitor, MonitorConfig, RunRequest,
};
use sitepulse::personalization::{
    EventKind, Personalization, VariantCatalog, VariantSummary,
};

fn engine_config(dir: &tempfile::TempDir) -> MonitorConfig {
    MonitorConfig {
        history_path: dir.path().join("logs").join("history.json"),
        run_delay: Duration::ZERO,
        targets: default_targets(),
    }
}

async fn drain(monitor: &Monitor, expected_runs: usize) {
    for _ in 0..400 {
        let ping = monitor.ping().await;
        if ping.queue_size == 0 && ping.history_size >= expected_runs {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("queue did not drain");
}

#[tokio::test]
async fn scheduled_runs_flow_into_monitoring_state() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = Monitor::new(engine_config(&dir)).await;

    monitor
        .schedule_run(RunRequest {
            url: Some("/pricing".into()),
            device: Some(Device::Desktop),
            ..RunRequest::default()
        })
        .await;
    monitor
        .schedule_run(RunRequest {
            url: Some("/".into()),
            device: Some(Device::Mobile),
            variant_id: Some("romantic_wedding".into()),
            ..RunRequest::default()
        })
        .await;
    drain(&monitor, 2).await;

    let state = monitor.monitoring_state().await;
    assert!(state.queue.is_empty());
    assert_eq!(state.runs.len(), 2);
    assert_eq!(state.runs[0].url, "/");
    assert_eq!(state.runs[1].url, "/pricing");
    assert!(state.runs.iter().all(|run| run.metrics.is_some()));
    assert!(state.summary.average_scores.is_some());
    assert_eq!(state.targets.len(), 4);
}

#[tokio::test]
async fn history_survives_an_engine_restart() {
    let dir = tempfile::tempdir().unwrap();

    let monitor = Monitor::new(engine_config(&dir)).await;
    monitor
        .schedule_run(RunRequest {
            url: Some("/pricing".into()),
            ..RunRequest::default()
        })
        .await;
    drain(&monitor, 1).await;
    let before = monitor.monitoring_state().await;
    drop(monitor);

    let restarted = Monitor::new(engine_config(&dir)).await;
    let ping = restarted.ping().await;
    assert_eq!(ping.history_size, 1);
    assert_eq!(ping.last_updated, before.updated_at);

    let state = restarted.monitoring_state().await;
    assert_eq!(state.runs[0].url, "/pricing");
}

#[tokio::test]
async fn repeated_audits_of_the_same_target_report_identical_scores() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = Monitor::new(engine_config(&dir)).await;

    for _ in 0..2 {
        monitor
            .schedule_run(RunRequest {
                url: Some("/locaties/eindhoven".into()),
                device: Some(Device::Mobile),
                ..RunRequest::default()
            })
            .await;
    }
    drain(&monitor, 2).await;

    let state = monitor.monitoring_state().await;
    assert_eq!(state.runs[0].metrics, state.runs[1].metrics);
    assert_eq!(state.runs[0].status, state.runs[1].status);
}

#[tokio::test]
async fn variant_analytics_aggregates_recorded_logs() {
    let catalog = VariantCatalog::from_variants(vec![VariantSummary {
        id: "romantic_wedding".into(),
        label: "Romantic wedding".into(),
        experiment_id: Some("wedding-v2".into()),
    }]);
    let personalization = Personalization::new(catalog);

    personalization
        .record_exposure(
            "romantic_wedding",
            Some("keyword".into()),
            vec!["bruiloft dj".into()],
        )
        .await;
    for kind in [
        EventKind::CtaClick,
        EventKind::FormStart,
        EventKind::FormSubmit,
        EventKind::Conversion,
    ] {
        personalization
            .record_event(kind, "romantic_wedding", Some("bruiloft dj".into()))
            .await;
    }

    let report = analytics::variant_analytics(&personalization).await;
    let wedding = report
        .variants
        .iter()
        .find(|variant| variant.variant_id == "romantic_wedding")
        .expect("romantic_wedding bucket");

    assert_eq!(wedding.exposures, 1);
    assert_eq!(wedding.cta_clicks, 1);
    assert_eq!(wedding.form_starts, 1);
    assert_eq!(wedding.form_submits, 1);
    assert_eq!(wedding.conversions, 1);
    assert_eq!(wedding.label, "Romantic wedding");
    assert!(report.totals.conversions >= 1);

    // No new log entries: a second read produces the same aggregates.
    let again = analytics::variant_analytics(&personalization).await;
    assert_eq!(report.variants, again.variants);
    assert_eq!(report.totals, again.totals);
}
