//! `localkb` - build and query a local hybrid knowledge base.
//!
//! ```bash
//! localkb build --encoder hash
//! localkb query "refund policy" --topk 5 --namespaces domain
//! localkb pack "add refund automation"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use localkb_cli::{parse_namespaces, render_results_table, ProgressReporter};
use localkb_core::config::{EncoderKind, KbConfig};
use localkb_core::paths::KbPaths;
use localkb_core::store::load_index_meta;
use localkb_core::KbError;
use localkb_embed::load_encoder;
use localkb_hybrid::{build_knowledge_base, write_pack_and_trace, RetrieveOptions, Retriever};
use localkb_text::Tokenizer;

#[derive(Parser)]
#[command(name = "localkb", version, about = "Local hybrid (vector + BM25) knowledge base")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncoderArg {
    Bert,
    Hash,
}

impl From<EncoderArg> for EncoderKind {
    fn from(arg: EncoderArg) -> Self {
        match arg {
            EncoderArg::Bert => EncoderKind::Bert,
            EncoderArg::Hash => EncoderKind::Hash,
        }
    }
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Feature request or requirement text
    query: String,

    /// Number of evidence chunks to return
    #[arg(long)]
    topk: Option<usize>,

    /// Comma-separated namespaces to search, e.g. domain,project. Empty means all.
    #[arg(long, default_value = "")]
    namespaces: String,

    /// Project root (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and index every .md/.txt file under .localkb/kb/raw
    Build {
        /// Project root (default: current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Embedding model name
        #[arg(long)]
        model: Option<String>,

        /// Encoder implementation
        #[arg(long, value_enum)]
        encoder: Option<EncoderArg>,
    },
    /// Print the fused top hits for a query
    Query(SearchArgs),
    /// Write knowledge-pack.md and trace.json for a query, building first if needed
    Pack(SearchArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Build { root, model, encoder } => {
            let root = project_root(root)?;
            let mut config = KbConfig::load(&root)?;
            if let Some(model) = model {
                config.embed.model = model;
            }
            if let Some(encoder) = encoder {
                config.embed.encoder = encoder.into();
            }
            config.validate()?;
            Ok(exit_code(build(&root, &config)?))
        }
        Command::Query(args) => {
            let root = project_root(args.root.clone())?;
            let config = KbConfig::load(&root)?;
            let hits = search(&root, &config, &args)?;
            print!("{}", render_results_table(&hits));
            Ok(ExitCode::SUCCESS)
        }
        Command::Pack(args) => {
            let root = project_root(args.root.clone())?;
            let config = KbConfig::load(&root)?;
            let paths = KbPaths::new(&root);
            paths.ensure_dirs()?;
            if !paths.vector_index().exists() || !paths.chunks_jsonl().exists() {
                eprintln!("Index not found. Running `localkb build` first...");
                if !build(&root, &config)? {
                    return Ok(ExitCode::FAILURE);
                }
            }
            let hits = search(&root, &config, &args)?;
            write_pack_and_trace(&paths, &args.query, &hits)?;
            println!("OK Knowledge pack generated:");
            println!("- {}", paths.knowledge_pack_md().display());
            println!("- {}", paths.trace_json().display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn project_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("reading current directory"),
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// `Ok(false)` when there was nothing to index.
fn build(root: &std::path::Path, config: &KbConfig) -> Result<bool> {
    let paths = KbPaths::new(root);
    println!("Indexing knowledge from: {}", paths.kb_raw().display());
    let encoder = load_encoder(config, root)?;
    let reporter = ProgressReporter::new()?;
    let summary = match build_knowledge_base(&paths, config, encoder.as_ref(), &Tokenizer::new(), &reporter) {
        Ok(summary) => summary,
        Err(KbError::NotFound(msg)) => {
            eprintln!("{msg}. Add some .md/.txt files first.");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };
    reporter.finish();
    println!("OK Built index with {} chunks (dim {}).", summary.num_chunks, summary.dim);
    for artifact in &summary.artifacts {
        println!("- {}", artifact.display());
    }
    Ok(true)
}

fn search(root: &std::path::Path, config: &KbConfig, args: &SearchArgs) -> Result<Vec<localkb_core::RetrievalHit>> {
    let paths = KbPaths::new(root);
    let encoder = load_encoder(config, root)?;
    if let Some(meta) = load_index_meta(&paths.index_meta())? {
        if meta.model != encoder.model_id() {
            warn!(built_with = %meta.model, querying_with = encoder.model_id(), "encoder differs from the one used to build the index");
        }
    }
    let options = RetrieveOptions::from_config(&config.retrieval)
        .with_topk(args.topk.unwrap_or(config.retrieval.topk))
        .with_namespaces(parse_namespaces(&args.namespaces));
    let retriever = Retriever::open(&paths, encoder.as_ref(), Arc::new(Tokenizer::new()))?
        .with_query_prefix(config.embed.query_prefix.clone());
    Ok(retriever.retrieve(&args.query, &options)?)
}
