//! API route definitions.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::state::AppState;
use crate::analytics;
use crate::monitor::RunRequest;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/monitoring", get(monitoring_state))
        .route("/monitoring/runs", post(schedule_run))
        .route("/analytics/variants", get(variant_analytics))
}

fn envelope(data: impl serde::Serialize) -> Json<Value> {
    Json(json!({
        "data": data,
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    envelope(state.monitor.ping().await)
}

async fn monitoring_state(State(state): State<AppState>) -> Json<Value> {
    envelope(state.monitor.monitoring_state().await)
}

/// Schedule an audit run. The body is optional and malformed JSON is
/// treated as an empty request; the engine normalizes whatever it gets.
async fn schedule_run(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let request: RunRequest = if body.is_empty() {
        RunRequest::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|error| {
            tracing::debug!(%error, "unparsable run request, scheduling defaults");
            RunRequest::default()
        })
    };

    envelope(state.monitor.schedule_run(request).await)
}

async fn variant_analytics(State(state): State<AppState>) -> Json<Value> {
    envelope(analytics::variant_analytics(state.personalization.as_ref()).await)
}
