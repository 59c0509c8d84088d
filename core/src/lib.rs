pub mod config;
pub mod engine;
pub mod error;
pub mod fields;
pub mod filter;
pub mod index;
pub mod persist;
pub mod product;
pub mod ranking;
pub mod synonyms;
pub mod tokenizer;

pub use config::{Bm25Params, EngineConfig, IndexerConfig, TrackedFeature};
pub use engine::{ScoredProduct, SearchEngine, SearchResults};
pub use error::{CatalogError, Result};
pub use fields::{Field, FieldIndex, SearchIndices};
pub use index::{
    DocId, FeatureIndex, IndexBuilder, IndexBundle, PositionalIndex, ReviewIndex, ReviewStats,
    TextField,
};
pub use product::{DocumentStore, FeatureValue, Product, Review};
pub use synonyms::SynonymTable;
pub use tokenizer::Tokenizer;
