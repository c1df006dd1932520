use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ticket_insights::config::{AnalyzerConfig, ProductCatalogConfig};
use ticket_insights::models::{AggregateResult, FilterCriteria, ProductReport, RankedCount, Topic, TopicReport};
use ticket_insights::pipeline::{TicketAnalyzer, TicketDataset, TicketPipeline};
use ticket_insights::processor::{Aggregator, InputFormat};

/// Filterable support-ticket insights over a JSON export.
#[derive(Parser, Debug)]
#[command(name = "ticket-insights", version)]
struct Cli {
    /// Analyzer config file (defaults to $TICKET_INSIGHTS_CONFIG, then configs/analyzer.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ticket export to analyze; overrides [input].path
    #[arg(long, short, global = true)]
    input: Option<PathBuf>,

    /// Input layout; overrides [input].format
    #[arg(long, global = true)]
    format: Option<FormatArg>,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Rebuild the dataset even if a memoized copy exists
    #[arg(long, global = true)]
    force: bool,

    #[command(flatten)]
    filters: FilterArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// First day to include (YYYY-MM-DD); defaults to the earliest ticket
    #[arg(long, global = true)]
    start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD); defaults to today
    #[arg(long, global = true)]
    end: Option<NaiveDate>,

    #[arg(long, global = true)]
    brand: Option<String>,

    /// return, defect or question
    #[arg(long, global = true)]
    topic: Option<Topic>,

    /// Product display name
    #[arg(long, global = true)]
    product: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rates, top products, top words and the monthly trend
    Overview,
    /// Drill into one topic
    Topic {
        #[arg(value_name = "TOPIC")]
        selected: Topic,
    },
    /// Deep dive on one product; lists available products when no name is given
    Product { name: Option<String> },
    /// Brands present in the dataset
    Brands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum FormatArg {
    Auto,
    Document,
    Lines,
}

impl From<FormatArg> for InputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => InputFormat::Auto,
            FormatArg::Document => InputFormat::Document,
            FormatArg::Lines => InputFormat::Lines,
        }
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AnalyzerConfig::load(cli.config.as_deref())?;

    let catalog = ProductCatalogConfig::load(config.reference.products_path.as_deref())?.into_catalog()?;
    let pipeline = TicketPipeline::from_config(&config, Arc::new(catalog))
        .context("Failed to build ticket pipeline")?;
    let mut analyzer =
        TicketAnalyzer::with_memo(pipeline, Aggregator::with_settings(config.aggregation), config.memo);

    let path = cli
        .input
        .clone()
        .or_else(|| config.input.path.clone())
        .context("No input file: pass --input or set [input].path in the config")?;
    let format = cli
        .format
        .map(InputFormat::from)
        .unwrap_or(config.input.format)
        .resolve(&path);

    info!("🚀 Loading tickets from {} ({:?})", path.display(), format);
    let raw = TicketPipeline::read_input(&path)?;
    let dataset = analyzer
        .load(&raw, format, Utc::now(), cli.force)
        .with_context(|| format!("Failed to load tickets from {}", path.display()))?;

    let summary = dataset.summary();
    if !summary.skipped_lines.is_empty() {
        warn!(
            "⚠️ Skipped {} malformed lines: {:?}",
            summary.skipped_lines.len(),
            summary.skipped_lines
        );
    }
    if summary.skipped_elements > 0 {
        warn!("⚠️ Skipped {} non-object records", summary.skipped_elements);
    }

    let criteria = build_criteria(&cli.filters, &dataset)?;

    match &cli.command {
        Command::Overview => {
            let result = analyzer.aggregate(&dataset, &criteria, cli.force)?;
            emit(cli.json, &*result, || print_overview(&criteria, &result))?;
        }
        Command::Topic { selected } => {
            let report = analyzer.topic_report(&dataset, &criteria, *selected);
            emit(cli.json, &report, || print_topic(&report))?;
        }
        Command::Product { name: Some(name) } => {
            let report = analyzer.product_report(&dataset, &criteria, name);
            if report.total == 0 {
                warn!("No tickets for '{}' in the selected range", name);
            }
            emit(cli.json, &report, || print_product(&report))?;
        }
        Command::Product { name: None } => {
            let names = analyzer.product_names(&dataset, &criteria);
            if names.is_empty() {
                warn!("No products available for the selected brand and date range");
            }
            emit(cli.json, &names, || print_list("Products", &names))?;
        }
        Command::Brands => {
            let brands = analyzer.brands(&dataset);
            emit(cli.json, &brands, || print_list("Brands", &brands))?;
        }
    }

    Ok(())
}

/// Explicit dates override the dataset's default range; the range is validated
/// before anything is aggregated.
fn build_criteria(filters: &FilterArgs, dataset: &TicketDataset) -> Result<FilterCriteria> {
    let defaults = dataset.default_criteria(Utc::now().date_naive())?;
    let start = filters.start.unwrap_or(defaults.start());
    let end = filters.end.unwrap_or(defaults.end());

    let mut criteria = FilterCriteria::new(start, end)?;
    if let Some(brand) = &filters.brand {
        criteria = criteria.with_brand(brand);
    }
    if let Some(topic) = filters.topic {
        criteria = criteria.with_topic(topic);
    }
    if let Some(product) = &filters.product {
        criteria = criteria.with_product(product);
    }
    Ok(criteria)
}

fn emit<T: Serialize + ?Sized>(json: bool, value: &T, text: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text();
    }
    Ok(())
}

fn print_ranked(title: &str, entries: &[RankedCount]) {
    println!("\n{}", title);
    if entries.is_empty() {
        println!("  (none)");
    }
    for (i, entry) in entries.iter().enumerate() {
        println!("  {:>2}. {:<48} {}", i + 1, entry.label, entry.count);
    }
}

fn print_overview(criteria: &FilterCriteria, result: &AggregateResult) {
    println!("📊 Support tickets {} to {}", criteria.start(), criteria.end());
    if let Some(brand) = criteria.brand() {
        println!("Brand: {}", brand);
    }
    println!("Total tickets: {}", result.total);
    for topic in Topic::ALL {
        println!(
            "{:<9} rate: {:>5.1}% ({})",
            topic,
            result.rates.get(topic),
            result.counts.get(topic)
        );
    }

    print_ranked("Top products", &result.top_products);
    print_ranked("Top words", &result.top_words);

    println!("\nMonthly trend");
    println!("  {:<8} {:>7} {:>7} {:>9} {:>6}", "month", "return", "defect", "question", "total");
    for bucket in &result.monthly_trend {
        println!(
            "  {:<8} {:>7} {:>7} {:>9} {:>6}",
            bucket.month,
            bucket.counts.returns,
            bucket.counts.defects,
            bucket.counts.questions,
            bucket.total()
        );
    }
}

fn print_topic(report: &TopicReport) {
    println!("🔎 {} analysis", report.topic);
    println!(
        "{} tickets, {:.1}% of the filtered selection",
        report.count, report.share_of_filtered
    );
    print_ranked(&format!("Top products with {} tickets", report.topic), &report.top_products);
    print_ranked(&format!("Top words in {} tickets", report.topic), &report.top_words);
}

fn print_product(report: &ProductReport) {
    println!("📦 {}", report.product_name);
    println!("Total tickets: {}", report.total);
    println!("Defect rate:   {:.1}%", report.defect_rate);
    println!("Return rate:   {:.1}%", report.return_rate);
    print_ranked("Complaint words", &report.complaint_words);

    println!("\nTickets");
    for ticket in &report.tickets {
        println!(
            "  {}  {:<8}  {}",
            ticket.created_at.format("%Y-%m-%d"),
            ticket.topic,
            ticket.description
        );
    }
}

fn print_list(title: &str, values: &[String]) {
    println!("{} ({})", title, values.len());
    for value in values {
        println!("  {}", value);
    }
}
