//! Variant funnel analytics.
//!
//! Joins the personalization exposure log with the funnel event log into
//! per-variant conversion reports. Pure read-side aggregation: recomputed on
//! every call, never cached, never mutating the source logs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::personalization::{
    EventKind, ExposureEntry, FunnelEvent, VariantFeed, VariantSummary,
};

/// Highest-frequency keywords surfaced per variant.
const TOP_KEYWORDS: usize = 5;
/// Trailing events kept per variant for display.
const RECENT_EVENTS: usize = 5;

/// Keyword with its exposure-match frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u64,
}

/// Trailing funnel event, for display alongside the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
}

/// Per-variant funnel report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantReport {
    pub variant_id: String,
    pub label: String,
    pub experiment_id: Option<String>,
    pub exposures: u64,
    pub impressions: u64,
    pub cta_clicks: u64,
    pub conversions: u64,
    pub form_starts: u64,
    pub form_submits: u64,
    pub conversion_rate: f64,
    pub cta_click_rate: f64,
    pub form_completion_rate: f64,
    pub match_types: BTreeMap<String, u64>,
    pub top_keywords: Vec<KeywordCount>,
    pub recent_events: Vec<RecentEvent>,
}

/// Funnel counters summed across all variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub exposures: u64,
    pub impressions: u64,
    pub cta_clicks: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub cta_click_rate: f64,
}

/// Full analytics snapshot: per-variant reports plus totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantAnalytics {
    pub updated_at: DateTime<Utc>,
    pub variants: Vec<VariantReport>,
    pub totals: Totals,
}

/// Read both logs from the feed and aggregate them.
pub async fn variant_analytics(feed: &dyn VariantFeed) -> VariantAnalytics {
    let variants = feed.variants().await;
    let exposures = feed.exposure_log().await;
    let events = feed.event_log().await;
    aggregate(&variants, &exposures, &events, Utc::now())
}

/// Working accumulator per variant id. Keyword counts keep first-encounter
/// order so frequency ties resolve stably.
struct Bucket {
    variant_id: String,
    label: String,
    experiment_id: Option<String>,
    exposures: u64,
    impressions: u64,
    cta_clicks: u64,
    conversions: u64,
    form_starts: u64,
    form_submits: u64,
    match_types: BTreeMap<String, u64>,
    keywords: Vec<(String, u64)>,
    events: Vec<RecentEvent>,
}

impl Bucket {
    fn new(variant_id: &str, catalog: &[VariantSummary]) -> Self {
        let known = catalog.iter().find(|variant| variant.id == variant_id);
        Self {
            variant_id: variant_id.to_string(),
            label: known
                .map(|variant| variant.label.clone())
                .unwrap_or_else(|| variant_id.to_string()),
            experiment_id: known.and_then(|variant| variant.experiment_id.clone()),
            exposures: 0,
            impressions: 0,
            cta_clicks: 0,
            conversions: 0,
            form_starts: 0,
            form_submits: 0,
            match_types: BTreeMap::new(),
            keywords: Vec::new(),
            events: Vec::new(),
        }
    }

    fn count_keyword(&mut self, keyword: &str) {
        match self.keywords.iter_mut().find(|(known, _)| known == keyword) {
            Some((_, count)) => *count += 1,
            None => self.keywords.push((keyword.to_string(), 1)),
        }
    }

    fn into_report(self) -> VariantReport {
        let mut keywords = self.keywords;
        keywords.sort_by(|a, b| b.1.cmp(&a.1));
        let top_keywords = keywords
            .into_iter()
            .take(TOP_KEYWORDS)
            .map(|(keyword, count)| KeywordCount { keyword, count })
            .collect();

        let recent_start = self.events.len().saturating_sub(RECENT_EVENTS);
        let recent_events = self.events[recent_start..].to_vec();

        let reach = or_nonzero(self.exposures, self.impressions);
        VariantReport {
            conversion_rate: rate(self.conversions, reach),
            cta_click_rate: rate(self.cta_clicks, reach),
            form_completion_rate: rate(
                self.form_submits,
                or_nonzero(self.form_starts, self.exposures),
            ),
            variant_id: self.variant_id,
            label: self.label,
            experiment_id: self.experiment_id,
            exposures: self.exposures,
            impressions: self.impressions,
            cta_clicks: self.cta_clicks,
            conversions: self.conversions,
            form_starts: self.form_starts,
            form_submits: self.form_submits,
            match_types: self.match_types,
            top_keywords,
            recent_events,
        }
    }
}

/// Join the exposure and event logs into sorted per-variant reports plus
/// totals.
pub fn aggregate(
    catalog: &[VariantSummary],
    exposures: &[ExposureEntry],
    events: &[FunnelEvent],
    updated_at: DateTime<Utc>,
) -> VariantAnalytics {
    let mut buckets: Vec<Bucket> = Vec::new();

    for entry in exposures {
        let bucket = ensure_bucket(&mut buckets, &entry.variant_id, catalog);
        bucket.exposures += 1;

        let match_type = entry.match_type.as_deref().unwrap_or("unknown");
        *bucket.match_types.entry(match_type.to_string()).or_insert(0) += 1;

        for keyword in &entry.matched_keywords {
            if keyword.is_empty() {
                continue;
            }
            bucket.count_keyword(&keyword.to_lowercase());
        }
    }

    for event in events {
        let bucket = ensure_bucket(&mut buckets, &event.variant_id, catalog);
        bucket.events.push(RecentEvent {
            kind: event.kind,
            created_at: event.created_at,
        });
        match event.kind {
            EventKind::Impression => bucket.impressions += 1,
            EventKind::CtaClick => bucket.cta_clicks += 1,
            EventKind::Conversion => bucket.conversions += 1,
            EventKind::FormStart => bucket.form_starts += 1,
            EventKind::FormSubmit => bucket.form_submits += 1,
            EventKind::Unknown => {}
        }
    }

    let mut variants: Vec<VariantReport> =
        buckets.into_iter().map(Bucket::into_report).collect();
    // Stable sort: ties keep first-encounter order.
    variants.sort_by(|a, b| b.exposures.cmp(&a.exposures));

    let mut totals = Totals {
        exposures: 0,
        impressions: 0,
        cta_clicks: 0,
        conversions: 0,
        conversion_rate: 0.0,
        cta_click_rate: 0.0,
    };
    for variant in &variants {
        totals.exposures += variant.exposures;
        totals.impressions += variant.impressions;
        totals.cta_clicks += variant.cta_clicks;
        totals.conversions += variant.conversions;
    }
    let reach = or_nonzero(totals.exposures, totals.impressions);
    totals.conversion_rate = rate(totals.conversions, reach);
    totals.cta_click_rate = rate(totals.cta_clicks, reach);

    VariantAnalytics {
        updated_at,
        variants,
        totals,
    }
}

fn ensure_bucket<'a>(
    buckets: &'a mut Vec<Bucket>,
    variant_id: &str,
    catalog: &[VariantSummary],
) -> &'a mut Bucket {
    let index = match buckets
        .iter()
        .position(|bucket| bucket.variant_id == variant_id)
    {
        Some(index) => index,
        None => {
            buckets.push(Bucket::new(variant_id, catalog));
            buckets.len() - 1
        }
    };
    &mut buckets[index]
}

fn or_nonzero(preferred: u64, fallback: u64) -> u64 {
    if preferred > 0 {
        preferred
    } else {
        fallback
    }
}

/// Percentage rounded to two decimals. A zero denominator yields 0, never
/// NaN or infinity.
fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    ((numerator as f64 / denominator as f64) * 10_000.0).round() / 100.0
}
