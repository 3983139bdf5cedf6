//! Operator CLI for the concept linker
//!
//! Usage:
//!   concept-linker build-catalog --vocabulary concepts.json
//!   concept-linker import-vectors --input sv.txt
//!   concept-linker suggest --term ytterdörr --annotations docs.json
//!   concept-linker stats

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use concept_linker::{
    load_or_build, AnnotatedDocument, CatalogIndex, ConceptLinker, HistoryRecord, JsonVocabulary,
    LinkerConfig, LinkerDeps, MemoryHistoryStore, NounAnalyzer, PlainAnalyzer,
    RecommenderContext, Term, VocabularySource, WordVectors,
};

#[derive(Parser)]
#[command(name = "concept-linker")]
#[command(about = "Link document terms to vocabulary concepts")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "CONCEPT_LINKER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the lookup and vectors snapshots
    #[arg(long, env = "CONCEPT_LINKER_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the concept lookup file from a vocabulary export
    BuildCatalog {
        /// JSON array of concepts with inline attributes
        #[arg(long)]
        vocabulary: PathBuf,
    },

    /// Convert a word2vec text model into the vectors snapshot
    ImportVectors {
        #[arg(long)]
        input: PathBuf,
    },

    /// Print ranked suggestions for one term as JSON
    Suggest {
        #[arg(long)]
        term: String,

        /// Annotated documents to train the history predictor on
        #[arg(long)]
        annotations: Option<PathBuf>,

        /// Accept/reject records (JSON array) of the user
        #[arg(long)]
        history: Option<PathBuf>,

        #[arg(long, default_value = "anonymous")]
        user: String,

        #[arg(long, default_value = "concept")]
        layer: String,
    },

    /// Show catalog and vector snapshot statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concept_linker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => LinkerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LinkerConfig::from_env(),
    };
    if cli.models_dir.is_some() {
        config.models_dir = cli.models_dir.clone();
    }

    match cli.command {
        Command::BuildCatalog { vocabulary } => build_catalog(&config, vocabulary).await,
        Command::ImportVectors { input } => import_vectors(&config, input),
        Command::Suggest {
            term,
            annotations,
            history,
            user,
            layer,
        } => suggest(&config, term, annotations, history, user, layer).await,
        Command::Stats => stats(&config),
    }
}

fn models_dir(config: &LinkerConfig) -> Result<PathBuf> {
    config
        .resolve_models_dir()
        .context("models directory unknown: pass --models-dir or set CONCEPT_LINKER_HOME")
}

async fn build_catalog(config: &LinkerConfig, vocabulary: PathBuf) -> Result<()> {
    let path = models_dir(config)?.join(&config.lookup_file.0);
    let source = JsonVocabulary::from_file(&vocabulary)
        .await
        .with_context(|| format!("reading vocabulary {}", vocabulary.display()))?;
    tracing::info!(concepts = source.len(), "Vocabulary loaded");

    let index = load_or_build(&path, Some(&source as &dyn VocabularySource), &PlainAnalyzer).await?;
    println!("{}", index.stats());
    Ok(())
}

fn import_vectors(config: &LinkerConfig, input: PathBuf) -> Result<()> {
    let path = models_dir(config)?.join(&config.vectors_file.0);
    let vectors = WordVectors::from_word2vec_file(&input)
        .with_context(|| format!("parsing {}", input.display()))?;
    vectors
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("{} words, {} dimensions → {}", vectors.len(), vectors.dim(), path.display());
    Ok(())
}

async fn suggest(
    config: &LinkerConfig,
    term: String,
    annotations: Option<PathBuf>,
    history: Option<PathBuf>,
    user: String,
    layer: String,
) -> Result<()> {
    let store = Arc::new(MemoryHistoryStore::new());
    if let Some(path) = history {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading history {}", path.display()))?;
        let records: Vec<HistoryRecord> = serde_json::from_str(&content)?;
        for record in records {
            store.record(&user, record).await;
        }
    }

    let analyzer: Arc<dyn NounAnalyzer> = Arc::new(PlainAnalyzer);
    let deps = LinkerDeps::new(analyzer.clone(), store, user, layer);
    let linker = ConceptLinker::new(config, deps).await;
    tracing::info!(status = ?linker.status(), "Engine ready");

    let context = RecommenderContext::new();
    if let Some(path) = annotations {
        let documents = AnnotatedDocument::load_all(&path)
            .with_context(|| format!("reading annotations {}", path.display()))?;
        linker.train(&context, &documents).await?;
    }

    let term = analyzer
        .analyze_word(&term)
        .unwrap_or_else(|| Term::from_text(term));
    let suggestions = linker.suggest(&context, &term).await;
    println!("{}", serde_json::to_string_pretty(&suggestions)?);
    Ok(())
}

fn stats(config: &LinkerConfig) -> Result<()> {
    let dir = models_dir(config)?;

    let lookup = dir.join(&config.lookup_file.0);
    match CatalogIndex::load(&lookup) {
        Ok(index) => println!("catalog: {}", index.stats()),
        Err(e) => println!("catalog: unavailable ({e})"),
    }

    let vectors = dir.join(&config.vectors_file.0);
    match WordVectors::load(&vectors) {
        Ok(v) => println!("vectors: {} words, {} dimensions", v.len(), v.dim()),
        Err(e) => println!("vectors: unavailable ({e})"),
    }
    Ok(())
}
