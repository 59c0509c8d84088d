use catalog_core::persist::{save_bundle, IndexPaths};
use catalog_core::{
    DocumentStore, EngineConfig, IndexBuilder, IndexerConfig, SearchEngine, Tokenizer,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Builds and saves the fixture indices, then opens an engine over them.
fn engine_with(config: EngineConfig) -> (SearchEngine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let tok = Tokenizer::default();
    let store = DocumentStore::load_jsonl(fixture("products.jsonl")).unwrap();
    let features = IndexerConfig::default().features;
    let bundle = IndexBuilder::new(&store, &tok).build_all(&features).unwrap();
    save_bundle(&IndexPaths::new(dir.path()), &bundle).unwrap();

    let synonyms = fixture("synonyms.json");
    let documents = fixture("products.jsonl");
    let engine =
        SearchEngine::open(&documents, dir.path(), Some(synonyms.as_path()), tok, config).unwrap();
    (engine, dir)
}

fn ids(results: &catalog_core::SearchResults) -> BTreeSet<&str> {
    results.products.iter().map(|p| p.product.id.as_str()).collect()
}

#[test]
fn synonym_reaches_origin_index() {
    let (engine, _dir) = engine_with(EngineConfig::default());
    let results = engine.search("brasil", 10).unwrap();
    assert_eq!(results.documents_after_filtering, 2);
    assert_eq!(
        ids(&results),
        BTreeSet::from(["https://web-scraping.dev/product/1", "https://web-scraping.dev/product/5"])
    );
}

#[test]
fn member_synonym_expands_to_canonical_and_phrases() {
    let (engine, _dir) = engine_with(EngineConfig::default());
    let terms = engine.query_terms("America");
    assert_eq!(terms, vec!["america", "united states", "usa"]);
    let results = engine.search("America", 10).unwrap();
    assert_eq!(
        ids(&results),
        BTreeSet::from([
            "https://web-scraping.dev/product/2",
            "https://web-scraping.dev/product/3?variant=six-pack"
        ])
    );
}

#[test]
fn results_are_limited_and_ordered() {
    let (engine, _dir) = engine_with(EngineConfig::default());
    let results = engine.search("chocolate", 2).unwrap();
    assert_eq!(results.total_documents, 6);
    assert_eq!(results.documents_after_filtering, 3);
    assert_eq!(results.products.len(), 2);
    assert!(results.products[0].score >= results.products[1].score);
}

#[test]
fn best_field_coverage_ranks_first() {
    let (engine, _dir) = engine_with(EngineConfig::default());
    let results = engine.search("dark chocolate", 5).unwrap();
    assert_eq!(results.products[0].product.id, "https://web-scraping.dev/product/6");
    assert!(results.products.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn empty_query_is_not_an_error() {
    let (engine, _dir) = engine_with(EngineConfig::default());
    for query in ["", "the and of", "!!!"] {
        let results = engine.search(query, 5).unwrap();
        assert_eq!(results.documents_after_filtering, 0);
        assert!(results.products.is_empty());
        assert_eq!(results.total_documents, 6);
    }
}

#[test]
fn results_are_saved_under_query_slug() {
    let out = tempfile::tempdir().unwrap();
    let config =
        EngineConfig { results_dir: Some(out.path().to_path_buf()), ..EngineConfig::default() };
    let (engine, _dir) = engine_with(config);
    engine.search("dark chocolate!", 5).unwrap();

    let saved = std::fs::read_to_string(out.path().join("dark_chocolate_.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(json["total_documents"], 6);
    let first = &json["products"][0];
    assert_eq!(first["url"], "https://web-scraping.dev/product/6");
    assert!(first["score"].as_f64().is_some());
    assert_eq!(first["product_features"]["brand"], "ChocoDelight");
}

#[test]
fn missing_artifacts_degrade_instead_of_failing() {
    let empty = tempfile::tempdir().unwrap();
    let engine = SearchEngine::open(
        &fixture("products.jsonl"),
        empty.path(),
        Some(empty.path().join("synonyms.json").as_path()),
        Tokenizer::default(),
        EngineConfig::default(),
    )
    .unwrap();
    let results = engine.search("chocolate", 5).unwrap();
    assert_eq!(results.total_documents, 6);
    assert!(results.products.is_empty());
}

#[test]
fn long_query_is_saved_instead_of_failing() {
    let out = tempfile::tempdir().unwrap();
    let config =
        EngineConfig { results_dir: Some(out.path().to_path_buf()), ..EngineConfig::default() };
    let (engine, _dir) = engine_with(config);
    let results = engine.search(&"chocolate ".repeat(30), 5).unwrap();
    assert_eq!(results.documents_after_filtering, 3);

    let saved: Vec<_> = std::fs::read_dir(out.path()).unwrap().collect();
    assert_eq!(saved.len(), 1);
}
