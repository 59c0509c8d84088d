use crate::config::EngineConfig;
use crate::error::Result;
use crate::fields::{Field, SearchIndices};
use crate::filter::DocumentFilter;
use crate::index::DocId;
use crate::persist::{save_query_results, IndexPaths};
use crate::product::{DocumentStore, Product};
use crate::ranking::{FieldLengths, RankedDoc, Ranker};
use crate::synonyms::SynonymTable;
use crate::tokenizer::Tokenizer;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct ScoredProduct {
    #[serde(flatten)]
    pub product: Product,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub total_documents: usize,
    pub documents_after_filtering: usize,
    pub products: Vec<ScoredProduct>,
}

/// Query pipeline: tokenize, expand synonyms, filter candidates, rank.
///
/// Documents, indices and field lengths are loaded together and only read
/// afterwards. A rebuild produces a new engine rather than patching this one.
pub struct SearchEngine {
    store: DocumentStore,
    indices: SearchIndices,
    synonyms: SynonymTable,
    tokenizer: Tokenizer,
    lengths: FieldLengths,
    config: EngineConfig,
}

impl SearchEngine {
    pub fn new(
        store: DocumentStore,
        indices: SearchIndices,
        synonyms: SynonymTable,
        tokenizer: Tokenizer,
        config: EngineConfig,
    ) -> Self {
        let lengths = FieldLengths::compute(&store, &tokenizer);
        Self { store, indices, synonyms, tokenizer, lengths, config }
    }

    /// Loads documents, index artifacts and the synonym table from disk.
    /// Missing index artifacts and a missing synonym file are tolerated.
    pub fn open(
        documents: &Path,
        index_dir: &Path,
        synonyms: Option<&Path>,
        tokenizer: Tokenizer,
        config: EngineConfig,
    ) -> Result<Self> {
        let store = DocumentStore::load_jsonl(documents)?;
        let indices = SearchIndices::load(&IndexPaths::new(index_dir))?;
        let synonyms = match synonyms.map(SynonymTable::load) {
            Some(Ok(table)) => {
                tracing::info!(groups = table.len(), "synonyms loaded");
                table
            }
            Some(Err(e)) if e.is_not_found() => {
                tracing::warn!(error = %e, "synonyms not found, expansion disabled");
                SynonymTable::default()
            }
            Some(Err(e)) => return Err(e),
            None => SynonymTable::default(),
        };
        tracing::info!(num_docs = store.len(), "search engine ready");
        Ok(Self::new(store, indices, synonyms, tokenizer, config))
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn indices(&self) -> &SearchIndices {
        &self.indices
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tokenized query with every term expanded to its synonym group.
    pub fn query_terms(&self, query: &str) -> Vec<String> {
        self.synonyms.expand_query(&self.tokenizer.tokenize(query))
    }

    pub fn filter(&self) -> DocumentFilter<'_> {
        DocumentFilter::new(&self.indices, &self.tokenizer)
    }

    pub fn ranker(&self) -> Ranker<'_> {
        Ranker::new(&self.indices, &self.lengths, self.store.len(), self.config.bm25)
    }

    /// Union of: brand and origin hits per single term, origin and domain
    /// hits over the whole term sequence, and any-term hits on title and
    /// description.
    pub fn matching_docs(&self, terms: &[String]) -> BTreeSet<DocId> {
        let filter = self.filter();
        let mut docs = BTreeSet::new();
        for term in terms {
            let single = std::slice::from_ref(term);
            docs.extend(filter.total_match(single, Field::Brand));
            docs.extend(filter.total_match(single, Field::Origin));
        }
        docs.extend(filter.total_match(terms, Field::Origin));
        docs.extend(filter.total_match(terms, Field::Domain));
        docs.extend(filter.partial_match(terms, Field::Title));
        docs.extend(filter.partial_match(terms, Field::Description));
        docs
    }

    pub fn rank(&self, terms: &[String], candidates: &BTreeSet<DocId>) -> Vec<RankedDoc> {
        self.ranker().rank(terms, candidates)
    }

    /// Runs the query and returns the top `limit` products.
    pub fn run_query(&self, query: &str, limit: usize) -> SearchResults {
        let start = Instant::now();
        let terms = self.query_terms(query);
        let candidates = self.matching_docs(&terms);
        let ranked = self.rank(&terms, &candidates);
        let products = ranked
            .into_iter()
            .filter_map(|r| {
                let product = self.store.get(&r.doc_id)?.clone();
                Some(ScoredProduct { product, score: r.score })
            })
            .take(limit)
            .collect();
        tracing::info!(
            query,
            terms = terms.len(),
            candidates = candidates.len(),
            took_ms = start.elapsed().as_millis() as u64,
            "query ranked"
        );
        SearchResults {
            query: query.to_string(),
            total_documents: self.store.len(),
            documents_after_filtering: candidates.len(),
            products,
        }
    }

    /// [`SearchEngine::run_query`], then writes the bundle to the configured
    /// results directory, if any.
    pub fn search(&self, query: &str, limit: usize) -> Result<SearchResults> {
        let results = self.run_query(query, limit);
        if let Some(dir) = &self.config.results_dir {
            let path = save_query_results(dir, query, &results)?;
            tracing::debug!(path = %path.display(), "results saved");
        }
        Ok(results)
    }
}
