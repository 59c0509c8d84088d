use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use catalog_core::{EngineConfig, Product, SearchEngine, SearchResults, Tokenizer};
use parking_lot::RwLock;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Deserialize)]
pub struct ProductParams {
    pub id: String,
}

/// Everything the app needs at startup.
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    pub documents: PathBuf,
    pub index_dir: PathBuf,
    pub synonyms: Option<PathBuf>,
    pub stopwords: Option<PathBuf>,
    pub engine: EngineConfig,
    pub admin_token: Option<String>,
    /// Comma-separated list of allowed origins; any origin when unset.
    pub cors_allow_origin: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<SearchEngine>>,
    pub settings: Arc<AppSettings>,
}

/// Loads documents, indices and synonyms together so they always come from
/// the same build.
pub fn open_engine(settings: &AppSettings) -> catalog_core::Result<SearchEngine> {
    let tokenizer = match &settings.stopwords {
        Some(path) => Tokenizer::from_file(path)?,
        None => Tokenizer::default(),
    };
    SearchEngine::open(
        &settings.documents,
        &settings.index_dir,
        settings.synonyms.as_deref(),
        tokenizer,
        settings.engine.clone(),
    )
}

pub fn build_app(settings: AppSettings) -> Result<Router> {
    let engine = open_engine(&settings)?;

    let cors = match &settings.cors_allow_origin {
        Some(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };
    let app_state = AppState {
        engine: Arc::new(RwLock::new(engine)),
        settings: Arc::new(settings),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/product", get(product_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, (StatusCode, String)> {
    let engine = state.engine.read();
    let k = params.k.unwrap_or(engine.config().limit).clamp(1, 100);
    engine
        .search(&params.q, k)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

pub async fn product_handler(
    State(state): State<AppState>,
    Query(params): Query<ProductParams>,
) -> Result<Json<Product>, (StatusCode, String)> {
    let engine = state.engine.read();
    engine
        .store()
        .get(&params.id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("no product {}", params.id)))
}

/// Re-opens documents and index artifacts from disk and swaps the whole
/// engine. Loading happens outside the lock; queries only wait for the swap.
async fn reload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let engine = open_engine(&state.settings)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let num_docs = engine.store().len();
    *state.engine.write() = engine;
    tracing::info!(index_dir = %state.settings.index_dir.display(), num_docs, "engine reloaded");
    Ok(Json(serde_json::json!({ "reloaded": true })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.settings.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
