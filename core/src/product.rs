//! Product records and the in-memory document store they live in.

use crate::error::{CatalogError, Result};
use crate::persist::open_artifact;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

lazy_static! {
    static ref VARIANT: Regex = Regex::new(r"variant=([^&]+)").expect("valid regex");
    static ref PRODUCT_NUMBER: Regex = Regex::new(r"/product/(\d+)").expect("valid regex");
}

/// A feature value as found in the raw record. Only `Text` values are
/// indexable; everything else is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Text(String),
    Other(serde_json::Value),
}

impl FeatureValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            FeatureValue::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub rating: Option<f64>,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Canonical page URL; the key every index uses.
    #[serde(rename = "url")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "product_features")]
    pub features: IndexMap<String, FeatureValue>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(rename = "product_reviews")]
    pub reviews: Vec<Review>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Product {
    /// Parses one raw record and derives its variant from the URL.
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        let mut product: Product = serde_json::from_str(line)?;
        product.variant = extract_variant(&product.id);
        Ok(product)
    }

    pub fn feature_text(&self, name: &str) -> Option<&str> {
        self.features.get(name).and_then(FeatureValue::as_text)
    }

    pub fn product_number(&self) -> Option<&str> {
        PRODUCT_NUMBER.captures(&self.id).and_then(|c| c.get(1)).map(|m| m.as_str())
    }
}

/// Value of the `variant` query parameter, if the URL has one.
pub fn extract_variant(url: &str) -> Option<String> {
    VARIANT.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

/// Products in ingestion order, addressable by id.
#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    products: Vec<Product>,
    by_id: HashMap<String, usize>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Result<Self> {
        let mut store = Self::new();
        for p in products {
            store.insert(p)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, product: Product) -> Result<()> {
        if self.by_id.contains_key(&product.id) {
            return Err(CatalogError::DuplicateId(product.id));
        }
        self.by_id.insert(product.id.clone(), self.products.len());
        self.products.push(product);
        Ok(())
    }

    /// Reads JSON Lines from `reader`, one product per non-blank line.
    /// Returns the number of products added.
    pub fn extend_from_reader<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut added = 0;
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let product = Product::from_json(&line)
                .map_err(|source| CatalogError::MalformedDocument { line: i + 1, source })?;
            tracing::debug!(id = %product.id, "product added");
            self.insert(product)?;
            added += 1;
        }
        Ok(added)
    }

    pub fn extend_from_jsonl<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let f = open_artifact(path.as_ref())?;
        self.extend_from_reader(BufReader::new(f))
    }

    pub fn load_jsonl<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut store = Self::new();
        store.extend_from_jsonl(path)?;
        Ok(store)
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.by_id.get(id).map(|&i| &self.products[i])
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }
}
