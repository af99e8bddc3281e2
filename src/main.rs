use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use catalog_etl::config::{Destination, PipelineConfig};
use catalog_etl::logging;
use catalog_etl::normalize::Normalizer;
use catalog_etl::pipeline::{Pipeline, PipelineReport, SourceOutcome};
use catalog_etl::source::{CsvSourceReader, SourceReader};
use catalog_etl::storage::open_writer;

#[derive(Parser)]
#[command(name = "catalog_etl")]
#[command(about = "Clean movie/show catalog files and load them into a warehouse table")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over the configured sources (the default)
    Run {
        /// Source location; repeat to replace NETFLIX_FILE1..3
        #[arg(long = "source")]
        sources: Vec<String>,
        /// sqlite:<file>, jsonl:<dir> or memory
        #[arg(long)]
        destination: Option<Destination>,
        /// Destination table name
        #[arg(long)]
        table: Option<String>,
        /// Seed for missing-genre fill
        #[arg(long)]
        seed: Option<u64>,
        /// Write the run report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Normalize one file and print the records as JSON lines
    Normalize {
        /// Path or URL of a CSV file
        input: String,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn print_report(report: &PipelineReport) {
    println!("\n📊 Pipeline Results (run {}):", report.run_id);
    for source in &report.sources {
        let location = source.location.as_deref().unwrap_or("<unset>");
        match &source.outcome {
            SourceOutcome::Skipped { reason } => {
                println!("   {}. {} skipped ({:?})", source.position, location, reason)
            }
            SourceOutcome::Loaded { rows, columns } => println!(
                "   {}. {} loaded {} rows x {} columns",
                source.position, location, rows, columns
            ),
            SourceOutcome::Partial { rows, stage, error, .. } => println!(
                "   {}. {} ⚠️  wrote {} partially cleaned rows (stopped at {}: {})",
                source.position, location, rows, stage, error
            ),
            SourceOutcome::WriteFailed { error } => {
                println!("   {}. {} ❌ load failed: {}", source.position, location, error)
            }
        }
    }
    println!("   Rows written: {}", report.rows_written());
}

async fn run(
    mut config: PipelineConfig,
    sources: Vec<String>,
    report_path: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    if !sources.is_empty() {
        config.sources = sources.into_iter().map(Some).collect();
    }

    let writer = open_writer(&config.destination)
        .with_context(|| format!("opening destination {:?}", config.destination))?;
    let mut pipeline = Pipeline::new(
        Box::new(CsvSourceReader::new()),
        writer,
        Normalizer::from_seed(config.genre_seed),
        config.table.clone(),
    );

    let report = pipeline.run(&config.sources).await;
    print_report(&report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn normalize_file(input: &str, seed: Option<u64>) -> anyhow::Result<ExitCode> {
    let batch = CsvSourceReader::new().read(input).await;
    if batch.is_empty() {
        error!("No records read from {}", input);
        return Ok(ExitCode::FAILURE);
    }

    let outcome = Normalizer::from_seed(seed).normalize(batch);
    for record in outcome.batch.to_json_records() {
        println!("{}", serde_json::to_string(&record)?);
    }

    Ok(if outcome.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env().context("loading configuration")?;
    let _log_guard = logging::init_logging(&config.log_dir);

    match cli.command {
        Some(Commands::Run {
            sources,
            destination,
            table,
            seed,
            report,
        }) => {
            if let Some(destination) = destination {
                config.destination = destination;
            }
            if let Some(table) = table {
                config.table = table;
            }
            if seed.is_some() {
                config.genre_seed = seed;
            }
            run(config, sources, report).await
        }
        Some(Commands::Normalize { input, seed }) => {
            normalize_file(&input, seed.or(config.genre_seed)).await
        }
        None => run(config, Vec::new(), None).await,
    }
}
