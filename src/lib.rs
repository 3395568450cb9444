//! SitePulse -- synthetic site-audit monitoring and variant analytics.
//!
//! This crate provides the observability engine behind a marketing site's
//! operations dashboard: an audit run queue drained by a single background
//! worker, deterministic Lighthouse/axe-style metric simulation, a bounded
//! on-disk run history, and per-variant conversion funnel analytics joined
//! from the personalization layer's exposure and event logs.

pub mod analytics;
pub mod api;
pub mod config;
pub mod monitor;
pub mod personalization;

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;

/// Start the SitePulse daemon: monitoring engine, personalization feed, and
/// API server.
pub async fn serve(config: Config) -> Result<()> {
    // 1. Monitoring engine (restores persisted history, spawns the worker)
    tracing::info!(history = %config.monitor.history_path.display(), "starting monitoring engine");
    let monitor = Arc::new(monitor::Monitor::new(config.monitor_config()).await);

    // 2. Personalization collaborator (variant catalog + in-memory logs)
    let catalog =
        personalization::VariantCatalog::load(&config.personalization.variants_path).await;
    let personalization = Arc::new(personalization::Personalization::new(catalog));

    // 3. API server
    let state = api::state::AppState {
        monitor,
        personalization,
    };
    let app = api::router(state);

    let addr: std::net::SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, "SitePulse listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
