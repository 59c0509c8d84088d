use anyhow::{anyhow, Result};
use catalog_core::persist::{save_bundle, save_meta, IndexPaths, MetaFile};
use catalog_core::{
    Bm25Params, DocumentStore, EngineConfig, IndexBuilder, IndexerConfig, SearchEngine, Tokenizer,
    TrackedFeature,
};
use clap::{Parser, Subcommand};
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the product catalog indices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every index from a JSONL file or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Stopword list, one word per line (defaults to the built-in English list)
        #[arg(long)]
        stopwords: Option<String>,
        /// Feature to index as `name=artifact`; repeatable.
        /// Defaults to brand, made in, material, colors
        #[arg(long = "feature", value_parser = parse_feature)]
        features: Vec<TrackedFeature>,
    },
    /// Run one query against built indices and save the results
    Query {
        /// Product JSONL the indices were built from
        #[arg(long)]
        documents: String,
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Synonym table (JSON object canonical -> [synonyms])
        #[arg(long)]
        synonyms: Option<String>,
        /// Directory for the per-query result file
        #[arg(long, default_value = "./output/search")]
        results_dir: String,
        #[arg(long)]
        stopwords: Option<String>,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        #[arg(long, default_value_t = 1.5)]
        k1: f64,
        #[arg(long, default_value_t = 0.75)]
        b: f64,
        /// Free-text query
        query: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, stopwords, features } => {
            let tokenizer = load_tokenizer(stopwords.as_deref())?;
            let config = if features.is_empty() {
                IndexerConfig::default()
            } else {
                IndexerConfig { features }
            };
            build_index(&input, &output, &tokenizer, &config)
        }
        Commands::Query {
            documents,
            index,
            synonyms,
            results_dir,
            stopwords,
            limit,
            k1,
            b,
            query,
        } => {
            let tokenizer = load_tokenizer(stopwords.as_deref())?;
            let config = EngineConfig {
                bm25: Bm25Params { k1, b },
                limit,
                results_dir: Some(PathBuf::from(results_dir)),
            };
            let engine = SearchEngine::open(
                Path::new(&documents),
                Path::new(&index),
                synonyms.as_deref().map(Path::new),
                tokenizer,
                config,
            )?;
            let results = engine.search(&query, engine.config().limit)?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
    }
}

fn parse_feature(s: &str) -> Result<TrackedFeature, String> {
    match s.split_once('=') {
        Some((name, artifact)) if !name.trim().is_empty() && !artifact.trim().is_empty() => {
            Ok(TrackedFeature::new(name.trim(), artifact.trim()))
        }
        _ => Err(format!("expected name=artifact, got {s:?}")),
    }
}

fn load_tokenizer(stopwords: Option<&str>) -> Result<Tokenizer> {
    Ok(match stopwords {
        Some(path) => Tokenizer::from_file(path)?,
        None => Tokenizer::default(),
    })
}

fn input_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        return Err(anyhow!("input {} does not exist", input.display()));
    }
    Ok(files)
}

fn build_index(
    input: &str,
    output: &str,
    tokenizer: &Tokenizer,
    config: &IndexerConfig,
) -> Result<()> {
    let out_paths = IndexPaths::new(output);

    let mut store = DocumentStore::new();
    for file in input_files(Path::new(input))? {
        let added = store.extend_from_jsonl(&file)?;
        tracing::info!(file = %file.display(), added, "ingested file");
    }
    tracing::info!(num_docs = store.len(), "ingested documents");

    let bundle = IndexBuilder::new(&store, tokenizer).build_all(&config.features)?;
    save_bundle(&out_paths, &bundle)?;

    let meta = MetaFile {
        num_docs: store.len() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        version: 1,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(output, "index build complete");
    Ok(())
}
