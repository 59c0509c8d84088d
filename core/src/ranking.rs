//! Hybrid ranking: per-field Okapi BM25 plus a heuristic score.
//!
//! ```text
//! score(d) = Σ_fields bm25(q, d, field) + ln(max(0.1, custom(q, d)))
//! custom(q, d) = 2·title_hits + description_hits
//!              + 2·mean_rating + ln(1 + total_reviews)
//!              + 0.4·100/(1 + first_title_pos) + 0.6·100/(1 + first_description_pos)
//! ```

use crate::config::Bm25Params;
use crate::fields::{Field, SearchIndices};
use crate::index::{DocId, TextField};
use crate::product::DocumentStore;
use crate::tokenizer::Tokenizer;
use serde::Serialize;
use std::collections::HashMap;

pub const TITLE_MATCH_WEIGHT: f64 = 2.0;
pub const DESCRIPTION_MATCH_WEIGHT: f64 = 1.0;
pub const RATING_WEIGHT: f64 = 2.0;
pub const POSITION_BOOST: f64 = 100.0;
pub const TITLE_POSITION_WEIGHT: f64 = 0.4;
pub const DESCRIPTION_POSITION_WEIGHT: f64 = 0.6;
/// First position assumed for a field with no matching term.
pub const NOT_FOUND_POSITION: usize = 9999;
/// Lower bound on the heuristic score before taking its logarithm.
pub const CUSTOM_SCORE_FLOOR: f64 = 0.1;

/// Token lengths of the free-text fields, per document and on average.
#[derive(Debug, Clone, Default)]
pub struct FieldLengths {
    title: HashMap<DocId, usize>,
    description: HashMap<DocId, usize>,
    avg_title: f64,
    avg_description: f64,
}

impl FieldLengths {
    pub fn compute(store: &DocumentStore, tokenizer: &Tokenizer) -> Self {
        let mut lengths = Self::default();
        for p in store.iter() {
            lengths.title.insert(p.id.clone(), tokenizer.token_count(&p.title));
            lengths.description.insert(p.id.clone(), tokenizer.token_count(&p.description));
        }
        if !store.is_empty() {
            let n = store.len() as f64;
            lengths.avg_title = lengths.title.values().sum::<usize>() as f64 / n;
            lengths.avg_description = lengths.description.values().sum::<usize>() as f64 / n;
        }
        lengths
    }

    pub fn doc_length(&self, field: TextField, doc_id: &str) -> f64 {
        let map = match field {
            TextField::Title => &self.title,
            TextField::Description => &self.description,
        };
        map.get(doc_id).copied().unwrap_or(0) as f64
    }

    pub fn avg_length(&self, field: TextField) -> f64 {
        match field {
            TextField::Title => self.avg_title,
            TextField::Description => self.avg_description,
        }
    }

    /// `doc_length / avg_doc_length`; single-valued fields are fixed at 1/1.
    fn length_ratio(&self, field: Field, doc_id: &str) -> f64 {
        match field.text_field() {
            Some(text) => {
                let avg = self.avg_length(text);
                if avg > 0.0 {
                    self.doc_length(text, doc_id) / avg
                } else {
                    1.0
                }
            }
            None => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDoc {
    pub doc_id: DocId,
    pub score: f64,
}

pub struct Ranker<'a> {
    indices: &'a SearchIndices,
    lengths: &'a FieldLengths,
    num_docs: usize,
    params: Bm25Params,
}

impl<'a> Ranker<'a> {
    pub fn new(
        indices: &'a SearchIndices,
        lengths: &'a FieldLengths,
        num_docs: usize,
        params: Bm25Params,
    ) -> Self {
        Self { indices, lengths, num_docs, params }
    }

    /// BM25 of one field. Terms absent from the document's field add nothing;
    /// a term repeated in the query is counted each time.
    pub fn compute_bm25<S: AsRef<str>>(&self, terms: &[S], doc_id: &str, field: Field) -> f64 {
        let index = self.indices.field(field);
        let Bm25Params { k1, b } = self.params;
        let n = self.num_docs as f64;
        let ratio = self.lengths.length_ratio(field, doc_id);
        let mut score = 0.0;
        for term in terms.iter().map(|t| t.as_ref()) {
            if !index.contains(term, doc_id) {
                continue;
            }
            let freq = index.term_freq(term, doc_id) as f64;
            let df = index.doc_freq(term) as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            score += idf * (freq * (k1 + 1.0)) / (freq + k1 * (1.0 - b + b * ratio));
        }
        score
    }

    pub fn bm25_composite<S: AsRef<str>>(&self, terms: &[S], doc_id: &str) -> f64 {
        Field::ALL.iter().map(|&f| self.compute_bm25(terms, doc_id, f)).sum()
    }

    pub fn custom_score<S: AsRef<str>>(&self, terms: &[S], doc_id: &str) -> f64 {
        let title = self.indices.field(Field::Title);
        let description = self.indices.field(Field::Description);
        let terms: Vec<&str> = terms.iter().map(|t| t.as_ref()).collect();

        let title_hits = terms.iter().filter(|t| title.contains(t, doc_id)).count() as f64;
        let description_hits =
            terms.iter().filter(|t| description.contains(t, doc_id)).count() as f64;
        let mut score =
            title_hits * TITLE_MATCH_WEIGHT + description_hits * DESCRIPTION_MATCH_WEIGHT;

        if let Some(stats) = self.indices.review_stats(doc_id) {
            score += stats.average_rating.unwrap_or(0.0) * RATING_WEIGHT;
            score += (1.0 + stats.total_reviews as f64).ln();
        }

        let first_title = terms.iter().filter_map(|t| title.first_position(t, doc_id)).min();
        let first_description =
            terms.iter().filter_map(|t| description.first_position(t, doc_id)).min();
        score += position_boost(first_title) * TITLE_POSITION_WEIGHT;
        score += position_boost(first_description) * DESCRIPTION_POSITION_WEIGHT;
        score
    }

    pub fn score<S: AsRef<str>>(&self, terms: &[S], doc_id: &str) -> f64 {
        let custom = self.custom_score(terms, doc_id);
        self.bm25_composite(terms, doc_id) + custom.max(CUSTOM_SCORE_FLOOR).ln()
    }

    /// Scores every candidate and orders them by descending score. Equal
    /// scores keep candidate order.
    pub fn rank<'c, S, I>(&self, terms: &[S], candidates: I) -> Vec<RankedDoc>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = &'c DocId>,
    {
        let mut ranked: Vec<RankedDoc> = candidates
            .into_iter()
            .map(|id| RankedDoc { doc_id: id.clone(), score: self.score(terms, id) })
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

fn position_boost(first: Option<usize>) -> f64 {
    POSITION_BOOST / (1.0 + first.unwrap_or(NOT_FOUND_POSITION) as f64)
}
