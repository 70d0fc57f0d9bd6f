use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use transaction_insights::{init_tracing, load_transactions, InsightsReport, Settings};

/// Aggregate statistics over a transaction dataset
#[derive(Parser, Debug)]
#[command(name = "transaction-insights", version)]
struct Cli {
    /// Settings file (defaults to ./insights.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset to load (.json or .csv)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Sender whose total sent amount is reported
    #[arg(long)]
    sender: Option<String>,

    /// Client checked for open compliance issues
    #[arg(long)]
    client: Option<String>,

    /// Size of the amount ranking
    #[arg(long)]
    top: Option<usize>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::new(cli.config.as_deref()).context("Failed to load settings")?;
    init_tracing(&settings.log.level);

    // Command-line flags win over every settings source
    if let Some(input) = cli.input {
        settings.input.path = input;
    }
    if let Some(sender) = cli.sender {
        settings.report.sender = sender;
    }
    if let Some(client) = cli.client {
        settings.report.client = client;
    }
    if let Some(top) = cli.top {
        settings.report.top_n = top;
    }

    let transactions = load_transactions(&settings.input.path)?;
    let report = InsightsReport::build(&transactions, &settings.report)
        .with_context(|| format!("Failed to aggregate {}", settings.input.path.display()))?;
    info!(transactions = report.transaction_count, "report ready");

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("📊 Transaction Insights v{}", transaction_insights::VERSION);
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("{}", report.summary());
    }

    Ok(())
}
