use crate::config::TrackedFeature;
use crate::error::{CatalogError, Result};
use crate::product::{DocumentStore, Product};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use time::macros::format_description;
use time::Date;

/// Product URL; the same key in every index.
pub type DocId = String;

/// term -> documents whose feature value equals the term.
pub type FeatureIndex = BTreeMap<String, BTreeSet<DocId>>;

/// term -> document -> ascending token offsets.
pub type PositionalIndex = BTreeMap<String, BTreeMap<DocId, Vec<usize>>>;

pub type ReviewIndex = BTreeMap<DocId, ReviewStats>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total_reviews: u32,
    pub average_rating: Option<f64>,
    pub last_rating: Option<f64>,
}

/// Free-text fields that get a positional index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Title,
    Description,
}

impl TextField {
    pub fn text<'a>(&self, product: &'a Product) -> &'a str {
        match self {
            TextField::Title => &product.title,
            TextField::Description => &product.description,
        }
    }
}

/// Every artifact a build produces, ready to be persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBundle {
    pub reviews: ReviewIndex,
    pub title: PositionalIndex,
    pub description: PositionalIndex,
    /// (artifact name, index) per tracked feature.
    pub features: Vec<(String, FeatureIndex)>,
}

/// Derives the indices from a snapshot of the document store. Builds are
/// wholesale; nothing here mutates a previously built index.
pub struct IndexBuilder<'a> {
    store: &'a DocumentStore,
    tokenizer: &'a Tokenizer,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(store: &'a DocumentStore, tokenizer: &'a Tokenizer) -> Self {
        Self { store, tokenizer }
    }

    pub fn build_all(&self, features: &[TrackedFeature]) -> Result<IndexBundle> {
        let reviews = self.build_reviews_index()?;
        let features = features
            .iter()
            .map(|f| (f.artifact.clone(), self.build_features_index(&f.feature)))
            .collect();
        let bundle = IndexBundle {
            reviews,
            title: self.build_positional_index(TextField::Title),
            description: self.build_positional_index(TextField::Description),
            features,
        };
        tracing::info!(
            num_docs = self.store.len(),
            title_terms = bundle.title.len(),
            description_terms = bundle.description.len(),
            "indices built"
        );
        Ok(bundle)
    }

    /// Review count, mean rating and the rating of the latest review.
    /// Reviews are ordered by date with a stable sort, so the last of several
    /// same-day reviews wins. An unparseable date aborts the build.
    pub fn build_reviews_index(&self) -> Result<ReviewIndex> {
        let format = format_description!("[year]-[month]-[day]");
        let mut index = ReviewIndex::new();
        for product in self.store.iter() {
            if product.reviews.is_empty() {
                index.insert(product.id.clone(), ReviewStats::default());
                continue;
            }
            let mut dated = Vec::with_capacity(product.reviews.len());
            for review in &product.reviews {
                let date =
                    Date::parse(&review.date, &format).map_err(|_| CatalogError::InvalidDate {
                        doc_id: product.id.clone(),
                        date: review.date.clone(),
                    })?;
                dated.push((date, review.rating));
            }
            let total = dated.len();
            let sum: f64 = dated.iter().map(|(_, r)| r.unwrap_or(0.0)).sum();
            dated.sort_by_key(|(d, _)| *d);
            let last_rating = dated.last().and_then(|(_, r)| *r);
            index.insert(
                product.id.clone(),
                ReviewStats {
                    total_reviews: total as u32,
                    average_rating: Some(sum / total as f64),
                    last_rating,
                },
            );
        }
        Ok(index)
    }

    /// Lower-cased feature value -> documents. Documents without the feature,
    /// or whose value is not text, are left out.
    pub fn build_features_index(&self, feature: &str) -> FeatureIndex {
        let mut index = FeatureIndex::new();
        for product in self.store.iter() {
            if let Some(value) = product.feature_text(feature) {
                index.entry(value.to_lowercase()).or_default().insert(product.id.clone());
            }
        }
        index
    }

    pub fn build_positional_index(&self, field: TextField) -> PositionalIndex {
        let mut index = PositionalIndex::new();
        for product in self.store.iter() {
            for (pos, term) in self.tokenizer.tokenize_with_positions(field.text(product)) {
                let positions =
                    index.entry(term).or_default().entry(product.id.clone()).or_default();
                if !positions.contains(&pos) {
                    positions.push(pos);
                }
            }
        }
        index
    }
}
