//! One-shot research from the command line: search, analyse, and print one
//! export format to stdout. Keys come from the environment variables named
//! in the config.

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use newsbrief::export::ExportKind;
use newsbrief::research::{self, Credentials, ResearchSettings};

#[derive(Parser, Debug)]
#[command(name = "brief", about = "Run one news research query and print the result")]
struct Args {
    /// Search query, e.g. "Tesla Q4 earnings"
    #[arg(long, short)]
    query: String,

    /// Days to look back
    #[arg(long)]
    days: Option<u32>,

    /// Maximum number of articles to fetch
    #[arg(long)]
    max_articles: Option<u32>,

    /// Chat model to use for the analysis
    #[arg(long)]
    model: Option<String>,

    /// Output format: report, html, csv, json, summary, email
    #[arg(long, default_value = "report")]
    format: String,

    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (logs go to stderr)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let kind: ExportKind = args.format.parse().map_err(anyhow::Error::msg)?;

    let config = Config::load_with_defaults(
        Some(Path::new("config.default.toml")),
        args.config.as_deref(),
    )
    .await
    .context("failed to load configuration")?;

    let defaults = ResearchSettings::from_config(&config);
    let settings = ResearchSettings {
        model: args.model.unwrap_or(defaults.model),
        days_back: args.days.unwrap_or(defaults.days_back),
        max_articles: args.max_articles.unwrap_or(defaults.max_articles),
        ..defaults
    }
    .clamp(&config);

    let credentials = Credentials::default().or_env(&config);
    info!(query = %args.query, model = %settings.model, format = kind.slug(), "running research");

    let result = research::research_with_config(&config, &args.query, settings, &credentials).await?;
    println!("{}", kind.render(&result)?);
    Ok(())
}
