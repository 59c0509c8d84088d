use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use catalog_core::persist::{save_bundle, IndexPaths};
use catalog_core::{DocumentStore, IndexBuilder, IndexerConfig, Tokenizer};
use http_body_util::BodyExt;
use serde_json::Value;
use server::{build_app, AppSettings};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const PRODUCTS: &str = include_str!("fixtures/products.jsonl");
const LANTERN: &str = include_str!("fixtures/lantern.jsonl");

/// Writes `jsonl` as the document file and rebuilds the index from it.
fn write_index(dir: &Path, jsonl: &str) {
    let documents = dir.join("products.jsonl");
    fs::write(&documents, jsonl).unwrap();
    let tok = Tokenizer::default();
    let store = DocumentStore::load_jsonl(&documents).unwrap();
    let features = IndexerConfig::default().features;
    let bundle = IndexBuilder::new(&store, &tok).build_all(&features).unwrap();
    save_bundle(&IndexPaths::new(dir.join("index")), &bundle).unwrap();
}

fn build_tiny_index(dir: &Path) -> AppSettings {
    write_index(dir, PRODUCTS);
    let documents = dir.join("products.jsonl");
    let index_dir = dir.join("index");
    AppSettings {
        documents,
        index_dir,
        admin_token: Some("secret".into()),
        ..AppSettings::default()
    }
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn product_uri(n: u32) -> String {
    format!("/product?id=https%3A%2F%2Fshop.test%2Fproduct%2F{n}")
}

fn reload() -> Request<Body> {
    Request::post("/index/reload")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let app = build_app(build_tiny_index(dir.path())).unwrap();

    let (status, json) = call(app, get("/search?q=dark%20chocolate&k=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_documents"], 3);
    assert_eq!(json["documents_after_filtering"], 2);
    let arr = json["products"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["url"], "https://shop.test/product/1");
    assert_eq!(arr[1]["url"], "https://shop.test/product/2");
    assert!(arr[0]["score"].as_f64().unwrap() > arr[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn product_lookup_by_url() {
    let dir = tempdir().unwrap();
    let app = build_app(build_tiny_index(dir.path())).unwrap();

    let (status, json) = call(app.clone(), get(&product_uri(3))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Energy Potion");

    let (status, _) = call(app, get(&product_uri(9))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_requires_admin_token() {
    let dir = tempdir().unwrap();
    let app = build_app(build_tiny_index(dir.path())).unwrap();

    let denied = Request::post("/index/reload").body(Body::empty()).unwrap();
    let (status, _) = call(app.clone(), denied).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = call(app, reload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reloaded"], true);
}

#[tokio::test]
async fn reload_picks_up_new_documents_with_their_index() {
    let dir = tempdir().unwrap();
    let app = build_app(build_tiny_index(dir.path())).unwrap();

    let (_, json) = call(app.clone(), get("/search?q=lantern")).await;
    assert_eq!(json["products"].as_array().unwrap().len(), 0);

    write_index(dir.path(), &format!("{PRODUCTS}{LANTERN}"));
    let (status, _) = call(app.clone(), reload()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = call(app.clone(), get("/search?q=lantern")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_documents"], 4);
    assert_eq!(json["documents_after_filtering"], 1);
    assert_eq!(json["products"][0]["url"], "https://shop.test/product/4");

    let (status, _) = call(app, get(&product_uri(4))).await;
    assert_eq!(status, StatusCode::OK);
}
