use anyhow::Result;
use axum::Router;
use catalog_core::{Bm25Params, EngineConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use server::{build_app, AppSettings};
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Product JSONL the indices were built from
    #[arg(long)]
    documents: PathBuf,
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Synonym table (JSON object canonical -> [synonyms])
    #[arg(long)]
    synonyms: Option<PathBuf>,
    /// Stopword list, one word per line
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Save every query's results here
    #[arg(long)]
    results_dir: Option<PathBuf>,
    /// Results per query when the request has no `k`
    #[arg(long, default_value_t = 5)]
    limit: usize,
    #[arg(long, default_value_t = 1.5)]
    k1: f64,
    #[arg(long, default_value_t = 0.75)]
    b: f64,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let settings = AppSettings {
        documents: args.documents,
        index_dir: args.index,
        synonyms: args.synonyms,
        stopwords: args.stopwords,
        engine: EngineConfig {
            bm25: Bm25Params { k1: args.k1, b: args.b },
            limit: args.limit,
            results_dir: args.results_dir,
        },
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
        cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
    };
    let app: Router = build_app(settings)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
