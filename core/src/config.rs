use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Okapi BM25 saturation and length-normalization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// A product feature that gets its own inverted index, and the artifact name
/// the index is saved under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFeature {
    pub feature: String,
    pub artifact: String,
}

impl TrackedFeature {
    pub fn new(feature: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self { feature: feature.into(), artifact: artifact.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub features: Vec<TrackedFeature>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            features: vec![
                TrackedFeature::new("brand", "brand_index"),
                TrackedFeature::new("made in", "origin_index"),
                TrackedFeature::new("material", "material_index"),
                TrackedFeature::new("colors", "colors_index"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bm25: Bm25Params,
    /// Results returned when the caller does not ask for a count.
    pub limit: usize,
    /// Where per-query result bundles are written; `None` disables saving.
    pub results_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { bm25: Bm25Params::default(), limit: 5, results_dir: None }
    }
}
