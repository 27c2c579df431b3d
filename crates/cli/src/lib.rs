//! # Figvec CLI
//!
//! Four stages, each reading the previous stage's file:
//!
//! ```text
//! figma_data.json ──extract──> text_nodes.json ──embed──> embedded_nodes.json
//!                                                              │
//!                                     vectors.index  <──build──┘
//!                                     vectors_meta.json
//!                                          │
//!                                  query "<text>" ──> ranked id [distance] → text
//! ```
//!
//! stdout carries results only; logs and progress go to stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use figvec_node_extractor::{read_nodes, write_nodes, ExtractorConfig, ExtractorError, NodeExtractor};
use figvec_vector_store::{
    embed_nodes, load_embedded_records, write_embedded_records, EmbeddingModel, IndexBuilder,
    IndexSearcher, SearchHit, StorePaths, VectorStoreError,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::path::PathBuf;

mod config;
mod flags;

pub use config::{IndexKindName, PathSettings, Settings, DEFAULT_CONFIG_FILE};
use flags::EmbedMode;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_VALIDATION: u8 = 2;
pub const EXIT_NOT_FOUND: u8 = 3;
pub const EXIT_INCONSISTENT_STORE: u8 = 4;
pub const EXIT_DIMENSION_MISMATCH: u8 = 5;

#[derive(Parser)]
#[command(name = "figvec")]
#[command(about = "Semantic search over text pulled from design-tool exports", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (default: ./figvec.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only errors, no progress bar
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Embedding backend
    #[arg(long, global = true, value_enum, env = "FIGVEC_EMBEDDING_MODE")]
    embed_mode: Option<EmbedMode>,

    /// Embedding model id
    #[arg(long, global = true, env = "FIGVEC_EMBEDDING_MODEL")]
    embed_model: Option<String>,

    /// Directory holding `<model-id>/model.onnx` and `tokenizer.json`
    #[arg(long, global = true, env = "FIGVEC_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Index file
    #[arg(long, global = true, env = "FIGVEC_INDEX_PATH")]
    index: Option<PathBuf>,

    /// Metadata file paired with the index
    #[arg(long, global = true, env = "FIGVEC_METADATA_PATH")]
    metadata: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull text nodes out of a design-document export
    Extract(ExtractArgs),

    /// Embed extracted text nodes
    Embed(EmbedArgs),

    /// Build and persist the vector index from embedded records
    Build(BuildArgs),

    /// Search the index with free text
    Query(QueryArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// Design-document JSON export
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where to write the extracted nodes
    #[arg(long)]
    output: Option<PathBuf>,

    /// Node type that carries text
    #[arg(long)]
    node_type: Option<String>,
}

#[derive(Args)]
struct EmbedArgs {
    /// Extracted nodes file
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where to write the embedded records
    #[arg(long)]
    output: Option<PathBuf>,

    /// Texts per embedding call
    #[arg(long)]
    batch_size: Option<usize>,
}

#[derive(Args)]
struct BuildArgs {
    /// Embedded records file
    #[arg(long)]
    input: Option<PathBuf>,

    /// Index strategy
    #[arg(long, value_enum)]
    kind: Option<IndexKindName>,

    /// IVF: number of lists
    #[arg(long)]
    lists: Option<usize>,

    /// IVF: lists probed per query
    #[arg(long)]
    probes: Option<usize>,
}

#[derive(Args)]
struct QueryArgs {
    /// Number of results
    #[arg(short = 'k', long = "top-k")]
    top_k: Option<usize>,

    /// Print results as a JSON array
    #[arg(long)]
    json: bool,

    /// Query text
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_global_flags(&cli, &mut settings);
    log::debug!("Settings: {settings:?}");

    match cli.command {
        Commands::Extract(args) => run_extract(args, &settings),
        Commands::Embed(args) => run_embed(args, &settings, cli.quiet).await,
        Commands::Build(args) => run_build(args, &settings).await,
        Commands::Query(args) => run_query(args, &settings).await,
    }
}

/// Exit status for a failed invocation, chosen by the first recognised cause.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(err) = cause.downcast_ref::<VectorStoreError>() {
            return match err {
                VectorStoreError::Validation(_) => EXIT_VALIDATION,
                VectorStoreError::NotFound { .. } => EXIT_NOT_FOUND,
                VectorStoreError::InconsistentStore { .. } => EXIT_INCONSISTENT_STORE,
                VectorStoreError::DimensionMismatch { .. } => EXIT_DIMENSION_MISMATCH,
                VectorStoreError::Extractor(inner) => extractor_exit_code(inner),
                _ => EXIT_FAILURE,
            };
        }
        if let Some(err) = cause.downcast_ref::<ExtractorError>() {
            return extractor_exit_code(err);
        }
        if let Some(err) = cause.downcast_ref::<io::Error>() {
            if err.kind() == io::ErrorKind::NotFound {
                return EXIT_NOT_FOUND;
            }
        }
    }
    EXIT_FAILURE
}

fn extractor_exit_code(err: &ExtractorError) -> u8 {
    match err {
        ExtractorError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
            EXIT_NOT_FOUND
        }
        ExtractorError::Io { .. } => EXIT_FAILURE,
        ExtractorError::Parse(_)
        | ExtractorError::InvalidConfig(_)
        | ExtractorError::MissingField { .. }
        | ExtractorError::TooDeep { .. } => EXIT_VALIDATION,
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // ORT is extremely noisy below verbose
    if !verbose {
        builder.filter_module("ort", log::LevelFilter::Off);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn apply_global_flags(cli: &Cli, settings: &mut Settings) {
    if let Some(mode) = cli.embed_mode {
        settings.embedding.mode = mode.as_domain();
    }
    if let Some(model) = &cli.embed_model {
        settings.embedding.model_id.clone_from(model);
    }
    if let Some(dir) = &cli.model_dir {
        settings.embedding.model_dir.clone_from(dir);
    }
    if let Some(index) = &cli.index {
        settings.paths.index.clone_from(index);
    }
    if let Some(metadata) = &cli.metadata {
        settings.paths.metadata.clone_from(metadata);
    }
}

fn store_paths(settings: &Settings) -> StorePaths {
    StorePaths::new(&settings.paths.index, &settings.paths.metadata)
}

fn run_extract(args: ExtractArgs, settings: &Settings) -> Result<()> {
    let input = args.input.unwrap_or_else(|| settings.paths.document.clone());
    let output = args.output.unwrap_or_else(|| settings.paths.nodes.clone());

    let config = match args.node_type {
        Some(node_type) => ExtractorConfig::for_node_type(node_type),
        None => ExtractorConfig::default(),
    };
    let extractor = NodeExtractor::new(config)?;
    let nodes = extractor.extract_file(&input)?;
    write_nodes(&output, &nodes)?;

    log::info!("Extracted {} nodes from {}", nodes.len(), input.display());
    print_stdout(&format!(
        "Extracted {} text nodes → {}",
        nodes.len(),
        output.display()
    ))
}

async fn run_embed(args: EmbedArgs, settings: &Settings, quiet: bool) -> Result<()> {
    let input = args.input.unwrap_or_else(|| settings.paths.nodes.clone());
    let output = args.output.unwrap_or_else(|| settings.paths.embedded.clone());
    let batch_size = args.batch_size.unwrap_or(settings.batch_size);
    if batch_size == 0 {
        return Err(VectorStoreError::validation("--batch-size must be at least 1").into());
    }

    let nodes = read_nodes(&input)?;
    let model = EmbeddingModel::new(&settings.embedding)?;

    let progress = progress_bar(nodes.len() as u64, quiet)?;
    let records = embed_nodes(&model, nodes, batch_size, |done| progress.inc(done as u64)).await;
    progress.finish_and_clear();
    let records = records?;

    write_embedded_records(&output, &records).await?;
    print_stdout(&format!(
        "Generated embeddings for {} items → {}",
        records.len(),
        output.display()
    ))
}

fn progress_bar(len: u64, quiet: bool) -> Result<ProgressBar> {
    if quiet || !io::stderr().is_terminal() {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{spinner} embedding [{bar:40}] {pos}/{len} ({eta})")
            .context("Invalid progress template")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

async fn run_build(args: BuildArgs, settings: &Settings) -> Result<()> {
    let input = args.input.unwrap_or_else(|| settings.paths.embedded.clone());
    let mut index = settings.index.clone();
    if let Some(kind) = args.kind {
        index.kind = kind;
    }
    if let Some(lists) = args.lists {
        index.lists = lists;
    }
    if let Some(probes) = args.probes {
        index.probes = probes;
    }

    let builder = IndexBuilder::new(index.to_kind())?;
    let records = load_embedded_records(&input)
        .await
        .with_context(|| format!("Failed to load embeddings from {}", input.display()))?;
    let paths = store_paths(settings);
    let (store, manifest) = builder
        .build_and_persist(&records, &paths)
        .await
        .with_context(|| format!("Failed to build index {}", paths.index().display()))?;

    log::info!(
        "Generation {} committed ({}, dim {})",
        manifest.generation,
        store.kind(),
        store.dimension()
    );
    print_stdout(&format!(
        "Index built ({} vectors) → {}",
        store.len(),
        paths.index().display()
    ))
}

async fn run_query(args: QueryArgs, settings: &Settings) -> Result<()> {
    let query = args.text.join(" ");
    let k = args.top_k.unwrap_or(settings.top_k);

    let model = EmbeddingModel::new(&settings.embedding)?;
    let paths = store_paths(settings);
    let searcher = IndexSearcher::open(&paths, model)
        .await
        .with_context(|| format!("Failed to open index {}", paths.index().display()))?;
    let hits = searcher
        .search(&query, k)
        .await
        .with_context(|| format!("Query against {} failed", paths.index().display()))?;

    if args.json {
        return print_stdout(&serde_json::to_string_pretty(&hits)?);
    }
    print_stdout(&render_hits(&query, &hits))
}

fn render_hits(query: &str, hits: &[SearchHit]) -> String {
    let mut out = format!("Search results for: \"{query}\"");
    for hit in hits {
        out.push_str(&format!(
            "\n• {} [{:.4}] → {}",
            hit.id, hit.distance, hit.text
        ));
    }
    out
}

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn hits_render_one_line_each() {
        let hits = vec![
            SearchHit {
                id: "1:2".into(),
                distance: 0.0,
                text: "Sign up".into(),
            },
            SearchHit {
                id: "1:7".into(),
                distance: 1.234_56,
                text: "Log in".into(),
            },
        ];
        assert_eq!(
            render_hits("sign", &hits),
            "Search results for: \"sign\"\n• 1:2 [0.0000] → Sign up\n• 1:7 [1.2346] → Log in"
        );
    }

    #[test]
    fn exit_codes_follow_the_error_kind() {
        let validation = anyhow::Error::from(VectorStoreError::validation("k must be at least 1"));
        assert_eq!(exit_code(&validation), EXIT_VALIDATION);

        let missing = anyhow::Error::from(VectorStoreError::NotFound {
            path: PathBuf::from("data/vectors.index"),
        })
        .context("Failed to open store");
        assert_eq!(exit_code(&missing), EXIT_NOT_FOUND);

        let inconsistent = anyhow::Error::from(VectorStoreError::inconsistent(
            Path::new("meta.json"),
            "2 ids for 3 vectors",
        ));
        assert_eq!(exit_code(&inconsistent), EXIT_INCONSISTENT_STORE);

        let dim = anyhow::Error::from(VectorStoreError::DimensionMismatch {
            expected: 384,
            actual: 3,
        });
        assert_eq!(exit_code(&dim), EXIT_DIMENSION_MISMATCH);

        let parse = anyhow::Error::from(ExtractorError::invalid_config("empty node_type"));
        assert_eq!(exit_code(&parse), EXIT_VALIDATION);

        assert_eq!(exit_code(&anyhow::anyhow!("boom")), EXIT_FAILURE);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
