//! Personalization collaborator boundary.
//!
//! The monitoring engine only ever reads from this layer: the variant
//! catalog plus the two append-only logs written by the variant-serving
//! pipeline. Variant matching itself lives with the personalization layer
//! and is out of scope here.

mod catalog;

pub use catalog::{VariantCatalog, VariantSummary};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Entries kept per log; the oldest are dropped past this cap.
pub const LOG_LIMIT: usize = 200;

/// One recorded exposure decision: which variant was shown, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureEntry {
    pub variant_id: String,
    #[serde(default)]
    pub match_type: Option<String>,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Funnel action attributed to a variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub variant_id: String,
    #[serde(default)]
    pub keyword: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Known funnel event types. Anything else deserializes to `Unknown` and is
/// carried along without being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Impression,
    CtaClick,
    Conversion,
    FormStart,
    FormSubmit,
    #[serde(other)]
    Unknown,
}

/// Read-only view the analytics side consumes from the personalization
/// layer. Log snapshots are cloned; the underlying logs are never mutated
/// through this trait.
#[async_trait]
pub trait VariantFeed: Send + Sync {
    async fn variants(&self) -> Vec<VariantSummary>;
    async fn exposure_log(&self) -> Vec<ExposureEntry>;
    async fn event_log(&self) -> Vec<FunnelEvent>;
}

/// The shipped collaborator: a variant catalog plus in-memory, append-only
/// exposure and funnel event logs.
pub struct Personalization {
    catalog: VariantCatalog,
    exposures: Mutex<Vec<ExposureEntry>>,
    events: Mutex<Vec<FunnelEvent>>,
}

impl Personalization {
    pub fn new(catalog: VariantCatalog) -> Self {
        Self {
            catalog,
            exposures: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Record that a variant was served for a request.
    pub async fn record_exposure(
        &self,
        variant_id: impl Into<String>,
        match_type: Option<String>,
        matched_keywords: Vec<String>,
    ) -> ExposureEntry {
        let entry = ExposureEntry {
            variant_id: variant_id.into(),
            match_type,
            matched_keywords,
            created_at: Utc::now(),
        };
        let mut log = self.exposures.lock().await;
        push_capped(&mut log, entry.clone());
        entry
    }

    /// Record a funnel action attributed to a variant.
    pub async fn record_event(
        &self,
        kind: EventKind,
        variant_id: impl Into<String>,
        keyword: Option<String>,
    ) -> FunnelEvent {
        let event = FunnelEvent {
            kind,
            variant_id: variant_id.into(),
            keyword,
            created_at: Utc::now(),
        };
        let mut log = self.events.lock().await;
        push_capped(&mut log, event.clone());
        event
    }

    /// Clear both logs for test isolation.
    pub async fn reset_logs(&self) {
        self.exposures.lock().await.clear();
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl VariantFeed for Personalization {
    async fn variants(&self) -> Vec<VariantSummary> {
        self.catalog.variants().to_vec()
    }

    async fn exposure_log(&self) -> Vec<ExposureEntry> {
        self.exposures.lock().await.clone()
    }

    async fn event_log(&self) -> Vec<FunnelEvent> {
        self.events.lock().await.clone()
    }
}

fn push_capped<T>(log: &mut Vec<T>, entry: T) {
    log.push(entry);
    let excess = log.len().saturating_sub(LOG_LIMIT);
    if excess > 0 {
        log.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logs_are_capped_at_the_limit() {
        let personalization = Personalization::new(VariantCatalog::empty());

        for index in 0..LOG_LIMIT + 10 {
            personalization
                .record_exposure(format!("variant_{index}"), None, Vec::new())
                .await;
        }

        let log = personalization.exposure_log().await;
        assert_eq!(log.len(), LOG_LIMIT);
        // The first ten entries were dropped from the front.
        assert_eq!(log[0].variant_id, "variant_10");
    }

    #[tokio::test]
    async fn reset_logs_clears_both_logs() {
        let personalization = Personalization::new(VariantCatalog::empty());
        personalization
            .record_exposure("romantic_wedding", Some("keyword".into()), vec![])
            .await;
        personalization
            .record_event(EventKind::CtaClick, "romantic_wedding", None)
            .await;

        personalization.reset_logs().await;
        assert!(personalization.exposure_log().await.is_empty());
        assert!(personalization.event_log().await.is_empty());
    }

    #[test]
    fn unknown_event_types_deserialize_without_error() {
        let event: FunnelEvent = serde_json::from_value(serde_json::json!({
            "type": "page_scroll",
            "variantId": "romantic_wedding",
            "createdAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(event.kind, EventKind::Unknown);
    }
}
