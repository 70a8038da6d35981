//! Converts a 2024-layout run file into the 2025 layout
//!
//! Run with: cargo run -p rag-attribution --bin rag-convert -- --input run.jsonl --output run25.jsonl

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rag_attribution::compliance::convert_run;
use rag_attribution::types::read_exec_prompts;

#[derive(Parser, Debug)]
#[command(name = "rag-convert", version)]
#[command(about = "Rewrite run records into the metadata-based 2025 layout")]
struct Cli {
    /// Run file in the 2024 layout
    #[arg(short, long)]
    input: PathBuf,

    /// Converted run file
    #[arg(short, long)]
    output: PathBuf,

    /// Execution summary file whose prompts are copied into `metadata.prompt`
    #[arg(short, long)]
    prompt_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_attribution=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let prompts = match &cli.prompt_file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open prompt file {}", path.display()))?;
            read_exec_prompts(BufReader::new(file))?
        }
        None => HashMap::new(),
    };

    let input = File::open(&cli.input)
        .with_context(|| format!("failed to open {}", cli.input.display()))?;
    let output = File::create(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;
    let summary = convert_run(BufReader::new(input), BufWriter::new(output), &prompts)?;

    println!(
        "{} {} record(s), {} skipped, written to {}",
        style("Converted").green().bold(),
        summary.converted,
        summary.failed,
        cli.output.display()
    );
    Ok(())
}
