//! Run file validator
//!
//! Run with: cargo run -p rag-attribution --bin rag-validate -- --topics topics.tsv run.jsonl

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rag_attribution::compliance::{BatchValidator, TopicSet};
use rag_attribution::config::{CitationFormat, EngineConfig, RunSchema};

#[derive(Parser, Debug)]
#[command(name = "rag-validate", version)]
#[command(about = "Check and repair a RAG generation run file against the output contract")]
struct Cli {
    /// Topic file: `id<TAB>text` lines or JSONL with `id` and `title`
    #[arg(short = 'f', long)]
    topics: PathBuf,

    /// Run file, one JSON answer record per line; `-` reads standard input
    runfile: PathBuf,

    /// Record layout
    #[arg(long, value_enum)]
    schema: Option<Schema>,

    /// What sentence citations hold
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Fixed output path (default: <RUNFILE>.fixed)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report findings without repairing
    #[arg(long)]
    no_repair: bool,

    /// Maximum answer length in words
    #[arg(long)]
    response_limit: Option<usize>,

    /// Maximum number of references per answer
    #[arg(long)]
    reference_limit: Option<usize>,

    /// Pattern every reference id should match
    #[arg(long)]
    reference_pattern: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Schema {
    Trec24,
    Trec25,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// Integer positions in `references`
    #[value(alias = "1")]
    Index,
    /// Segment ids listed in `references`
    #[value(alias = "2")]
    SegmentId,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_attribution=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(255),
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            std::process::exit(255);
        }
    }
}

/// Returns whether the run is free of errors
fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if cli.no_repair {
        config.compliance.repair = false;
    }
    if let Some(limit) = cli.response_limit {
        config.compliance.response_limit = limit;
    }
    if let Some(limit) = cli.reference_limit {
        config.compliance.reference_limit = limit;
    }
    if let Some(pattern) = cli.reference_pattern {
        config.compliance.reference_pattern = pattern;
    }
    if let Some(schema) = cli.schema {
        config.compliance.schema = match schema {
            Schema::Trec24 => RunSchema::Trec24,
            Schema::Trec25 => RunSchema::Trec25,
        };
    }
    if let Some(format) = cli.format {
        config.compliance.citation_format = match format {
            Format::Index => CitationFormat::Index,
            Format::SegmentId => CitationFormat::SegmentId,
        };
    }
    config.validate().context("invalid configuration")?;

    let topics = TopicSet::load(&cli.topics)
        .with_context(|| format!("failed to read topics from {}", cli.topics.display()))?;
    let validator = BatchValidator::new(&config.compliance)?;
    let summary = validator
        .run_files(&cli.runfile, &topics, cli.output.as_deref())
        .with_context(|| format!("failed to validate {}", cli.runfile.display()))?;

    let accepted = summary.accepted().count();
    println!(
        "{} {} record(s), {} accepted, {} error(s), {} warning(s)",
        style("Validated").green().bold(),
        summary.outcomes.len(),
        accepted,
        summary.error_count(),
        summary.warning_count(),
    );

    if summary.has_errors() {
        println!("{}", style("Run has errors, see the .errlog file").red());
        Ok(false)
    } else {
        println!("{}", style("No errors").green());
        Ok(true)
    }
}
