use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ticket_insights::config::AnalyzerConfig;
use ticket_insights::pipeline::TicketPipeline;
use ticket_insights::processor::{InputFormat, ProductCatalog};
use ticket_insights::report::DataProfiler;
use ticket_insights::storage::{TableFormat, TableWriter};

/// Profiles a nested ticket export and saves it as one flat table.
#[derive(Parser, Debug)]
#[command(name = "profile_tickets", version)]
struct Cli {
    /// Ticket export to profile; defaults to [input].path
    input: Option<PathBuf>,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Read one JSON record per line regardless of the file extension
    #[arg(long)]
    lines: bool,

    /// Flat table destination; defaults to [report].output_path
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long, value_enum)]
    output_format: Option<OutputFormat>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Csv,
    Parquet,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AnalyzerConfig::load(cli.config.as_deref())?;

    let path = cli
        .input
        .or_else(|| config.input.path.clone())
        .context("No input file: pass a path or set [input].path in the config")?;
    let format = if cli.lines {
        InputFormat::Lines
    } else {
        config.input.format.resolve(&path)
    };

    info!("--- Loading tickets from '{}' ---", path.display());
    let raw = TicketPipeline::read_input(&path)?;

    // Profiling never joins, so the product table is not loaded.
    let pipeline = TicketPipeline::from_config(&config, Arc::new(ProductCatalog::default()))?;
    let (extraction, mut df) = pipeline
        .extract_and_flatten(&raw, format)
        .with_context(|| format!("Could not profile {}", path.display()))?;

    let report = DataProfiler::from_report_config(&config.report).profile(&extraction, &df)?;
    print!("{}", report);

    let table_format = match cli.output_format {
        Some(OutputFormat::Csv) => TableFormat::Csv,
        Some(OutputFormat::Parquet) => TableFormat::Parquet,
        None => config.report.output_format,
    };
    let output = cli.output.unwrap_or_else(|| config.report.output_path.clone());

    let written = TableWriter::new(table_format).write(&mut df, &output)?;
    println!("\nFull flattened table saved to '{}'", written.display());

    Ok(())
}
