//! Searchable fields and the loaded indices behind them.

use crate::error::{CatalogError, Result};
use crate::index::{FeatureIndex, IndexBundle, PositionalIndex, ReviewIndex, ReviewStats, TextField};
use crate::persist::{load_index, IndexPaths, DESCRIPTION_INDEX, REVIEWS_INDEX, TITLE_INDEX};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Description,
    Origin,
    Brand,
    Domain,
}

impl Field {
    pub const ALL: [Field; 5] =
        [Field::Title, Field::Description, Field::Origin, Field::Brand, Field::Domain];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Origin => "origin",
            Field::Brand => "brand",
            Field::Domain => "domain",
        }
    }

    /// Name of the persisted artifact holding this field's index.
    pub fn artifact(&self) -> &'static str {
        match self {
            Field::Title => TITLE_INDEX,
            Field::Description => DESCRIPTION_INDEX,
            Field::Origin => "origin_index",
            Field::Brand => "brand_index",
            Field::Domain => "domain_index",
        }
    }

    /// Free-text fields have a token length; the others are single-valued.
    pub fn text_field(&self) -> Option<TextField> {
        match self {
            Field::Title => Some(TextField::Title),
            Field::Description => Some(TextField::Description),
            Field::Origin | Field::Brand | Field::Domain => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownField(s.to_string()))
    }
}

/// Read-only view over one field's index. An index that was never loaded
/// behaves as an empty one.
#[derive(Debug, Clone, Copy)]
pub enum FieldIndex<'a> {
    Positional(&'a PositionalIndex),
    Inverted(&'a FeatureIndex),
    Unavailable,
}

impl<'a> FieldIndex<'a> {
    pub fn contains_term(&self, term: &str) -> bool {
        match self {
            FieldIndex::Positional(idx) => idx.contains_key(term),
            FieldIndex::Inverted(idx) => idx.contains_key(term),
            FieldIndex::Unavailable => false,
        }
    }

    pub fn doc_ids(&self, term: &str) -> Vec<&'a str> {
        match *self {
            FieldIndex::Positional(idx) => {
                idx.get(term).map(|d| d.keys().map(String::as_str).collect())
            }
            FieldIndex::Inverted(idx) => {
                idx.get(term).map(|d| d.iter().map(String::as_str).collect())
            }
            FieldIndex::Unavailable => None,
        }
        .unwrap_or_default()
    }

    pub fn doc_freq(&self, term: &str) -> usize {
        match self {
            FieldIndex::Positional(idx) => idx.get(term).map_or(0, |d| d.len()),
            FieldIndex::Inverted(idx) => idx.get(term).map_or(0, |d| d.len()),
            FieldIndex::Unavailable => 0,
        }
    }

    pub fn contains(&self, term: &str, doc_id: &str) -> bool {
        match self {
            FieldIndex::Positional(idx) => idx.get(term).is_some_and(|d| d.contains_key(doc_id)),
            FieldIndex::Inverted(idx) => idx.get(term).is_some_and(|d| d.contains(doc_id)),
            FieldIndex::Unavailable => false,
        }
    }

    /// Occurrences of `term` in the document's field. Single-valued fields
    /// report presence as one occurrence.
    pub fn term_freq(&self, term: &str, doc_id: &str) -> usize {
        match self {
            FieldIndex::Positional(idx) => {
                idx.get(term).and_then(|d| d.get(doc_id)).map_or(0, Vec::len)
            }
            FieldIndex::Inverted(_) => usize::from(self.contains(term, doc_id)),
            FieldIndex::Unavailable => 0,
        }
    }

    /// Smallest recorded offset of `term` in the document.
    pub fn first_position(&self, term: &str, doc_id: &str) -> Option<usize> {
        match self {
            FieldIndex::Positional(idx) => idx.get(term)?.get(doc_id)?.iter().copied().min(),
            FieldIndex::Inverted(_) | FieldIndex::Unavailable => None,
        }
    }
}

/// The indices a search runs against. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchIndices {
    pub title: Option<PositionalIndex>,
    pub description: Option<PositionalIndex>,
    pub origin: Option<FeatureIndex>,
    pub brand: Option<FeatureIndex>,
    pub domain: Option<FeatureIndex>,
    pub reviews: Option<ReviewIndex>,
}

impl SearchIndices {
    /// Loads every artifact from `paths`. An absent file is logged and left
    /// unset; any other failure is returned.
    pub fn load(paths: &IndexPaths) -> Result<Self> {
        Ok(Self {
            title: load_optional(paths, Field::Title.artifact())?,
            description: load_optional(paths, Field::Description.artifact())?,
            origin: load_optional(paths, Field::Origin.artifact())?,
            brand: load_optional(paths, Field::Brand.artifact())?,
            domain: load_optional(paths, Field::Domain.artifact())?,
            reviews: load_optional(paths, REVIEWS_INDEX)?,
        })
    }

    /// Takes the indices straight from a fresh build. A build never produces
    /// a domain index, so it stays unset.
    pub fn from_bundle(bundle: IndexBundle) -> Self {
        let mut indices = Self {
            title: Some(bundle.title),
            description: Some(bundle.description),
            reviews: Some(bundle.reviews),
            ..Self::default()
        };
        for (name, index) in bundle.features {
            if name == Field::Origin.artifact() {
                indices.origin = Some(index);
            } else if name == Field::Brand.artifact() {
                indices.brand = Some(index);
            } else if name == Field::Domain.artifact() {
                indices.domain = Some(index);
            }
        }
        indices
    }

    pub fn field(&self, field: Field) -> FieldIndex<'_> {
        match field {
            Field::Title => positional(&self.title),
            Field::Description => positional(&self.description),
            Field::Origin => inverted(&self.origin),
            Field::Brand => inverted(&self.brand),
            Field::Domain => inverted(&self.domain),
        }
    }

    pub fn review_stats(&self, doc_id: &str) -> Option<&ReviewStats> {
        self.reviews.as_ref()?.get(doc_id)
    }
}

fn positional(index: &Option<PositionalIndex>) -> FieldIndex<'_> {
    index.as_ref().map_or(FieldIndex::Unavailable, FieldIndex::Positional)
}

fn inverted(index: &Option<FeatureIndex>) -> FieldIndex<'_> {
    index.as_ref().map_or(FieldIndex::Unavailable, FieldIndex::Inverted)
}

fn load_optional<T: DeserializeOwned>(paths: &IndexPaths, name: &str) -> Result<Option<T>> {
    match load_index(paths, name) {
        Ok(index) => {
            tracing::info!(artifact = name, "index loaded");
            Ok(Some(index))
        }
        Err(e) if e.is_not_found() => {
            tracing::warn!(artifact = name, "index not found, treating as empty");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
