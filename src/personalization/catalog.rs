//! Variant catalog loaded from the keyword-variants JSON file.
//!
//! Only the identity fields (id, label, experiment id) are consumed here;
//! the full variant payload belongs to the personalization layer proper.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

/// Identity of a configured personalization variant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSummary {
    pub id: String,
    pub label: String,
    pub experiment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    #[serde(default)]
    variants: Vec<CatalogVariant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogVariant {
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    cro: Option<CroSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CroSection {
    #[serde(default)]
    experiment_id: Option<String>,
}

/// The set of configured variants known to the personalization layer.
#[derive(Debug, Clone, Default)]
pub struct VariantCatalog {
    variants: Vec<VariantSummary>,
}

impl VariantCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from variant summaries directly (tests, embedding).
    pub fn from_variants(variants: Vec<VariantSummary>) -> Self {
        Self { variants }
    }

    /// Load the catalog from disk. A missing or unparsable file yields an
    /// empty catalog; analytics then falls back to variant ids as labels.
    pub async fn load(path: &Path) -> Self {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(error) => {
                debug!(%error, path = %path.display(), "variant catalog unavailable, using empty catalog");
                return Self::empty();
            }
        };

        match serde_json::from_slice::<CatalogFile>(&raw) {
            Ok(file) => Self {
                variants: file
                    .variants
                    .into_iter()
                    .map(|variant| VariantSummary {
                        label: variant.label.unwrap_or_else(|| variant.id.clone()),
                        experiment_id: variant.cro.and_then(|cro| cro.experiment_id),
                        id: variant.id,
                    })
                    .collect(),
            },
            Err(error) => {
                warn!(%error, path = %path.display(), "variant catalog unparsable, using empty catalog");
                Self::empty()
            }
        }
    }

    pub fn variants(&self) -> &[VariantSummary] {
        &self.variants
    }
}
