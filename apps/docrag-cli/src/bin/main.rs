//! `docrag`: ingest documents into a local store and query it.
//!
//! ```bash
//! docrag ingest ./docs report.pdf
//! docrag query "what does the CTO own?" -k 4
//! docrag query "solar" --json --no-keyword
//! docrag status
//! docrag clear
//! ```

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use docrag_core::config::{Config, Settings};
use docrag_core::Embedder;
use docrag_embed::build_embedder;
use docrag_hybrid::{format_context, RagEngine, RetrievalOutcome};

#[derive(Parser)]
#[command(name = "docrag", version, about = "Local document retrieval with hybrid semantic + keyword search")]
struct Cli {
    /// Store file (overrides `store.path`)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, chunk and embed files or directories into the store
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Search the store
    Query {
        text: String,
        /// Number of results
        #[arg(short, long)]
        k: Option<usize>,
        /// Minimum score to keep a result
        #[arg(long)]
        threshold: Option<f32>,
        /// Semantic ranking only
        #[arg(long)]
        no_keyword: bool,
        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what the store holds
    Status,
    /// Delete every chunk and the store file
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let mut settings = config.settings()?;
    if let Some(store) = &cli.store {
        settings.store.path = store.to_string_lossy().to_string();
    }

    match cli.command {
        Command::Ingest { paths } => ingest(&settings, &paths).await,
        Command::Query { text, k, threshold, no_keyword, json } => {
            if no_keyword {
                settings.retrieval.keyword.enabled = false;
            }
            query(&settings, &text, k, threshold, json).await
        }
        Command::Status => status(&settings),
        Command::Clear => {
            let mut engine = open_engine(&settings)?;
            engine.clear()?;
            println!("Cleared {}", engine.store().path().display());
            Ok(())
        }
    }
}

fn open_engine(settings: &Settings) -> Result<RagEngine> {
    let embedder = build_embedder(&settings.embedding)?;
    Ok(RagEngine::from_settings(settings, embedder)?)
}

async fn ingest(settings: &Settings, paths: &[PathBuf]) -> Result<()> {
    let mut engine = open_engine(settings)?;
    let files: Vec<PathBuf> = paths.iter().flat_map(|p| engine.discover(p)).collect();
    if files.is_empty() {
        println!("No supported files found (pdf, docx, csv, txt, md).");
        return Ok(());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let (mut chunks, mut failed) = (0usize, 0usize);
    for file in &files {
        pb.set_message(file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
        match engine.index_document(file).await {
            Ok(added) => chunks += added,
            Err(e) => {
                failed += 1;
                warn!(path = %file.display(), "ingest failed: {}", e);
                pb.println(format!("Skipped {}: {}", file.display(), e));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    engine.flush()?;

    println!("Indexed {} chunks from {} files into {}", chunks, files.len() - failed, engine.store().path().display());
    if failed > 0 {
        return Err(anyhow!("{} of {} files failed", failed, files.len()));
    }
    Ok(())
}

async fn query(settings: &Settings, text: &str, k: Option<usize>, threshold: Option<f32>, json: bool) -> Result<()> {
    let engine = open_engine(settings)?;
    let mut request = engine.retriever().query(text);
    if let Some(k) = k {
        request.k = k;
    }
    if threshold.is_some() {
        request.threshold = threshold;
    }
    let outcome = engine.search_with(&request).await?;

    if json {
        let value = serde_json::json!({
            "query": text,
            "results": outcome.results(),
            "message": outcome.message(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    match &outcome {
        RetrievalOutcome::Found(results) => println!("{}", format_context(results)),
        _ => println!("{}", outcome.message().unwrap_or_default()),
    }
    Ok(())
}

fn status(settings: &Settings) -> Result<()> {
    let engine = open_engine(settings)?;
    let store = engine.store();
    let sources: BTreeSet<String> = store
        .chunks()
        .iter()
        .filter_map(|c| c.metadata.get("source").map(ToString::to_string))
        .collect();
    println!("Store:     {}", store.path().display());
    println!("Embedder:  {}", store.embedder().id());
    println!("Chunks:    {}", store.len());
    println!("Sources:   {}", sources.len());
    match store.dimension() {
        Some(dim) => println!("Dimension: {}", dim),
        None => println!("Dimension: -"),
    }
    Ok(())
}
