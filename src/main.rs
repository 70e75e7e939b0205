//! # Bill Trends
//!
//! A pipeline that follows recently passed National Assembly bills from the
//! legislative site to public interest in them. Stages exchange data only
//! through TSV tables under the data directory and run one per invocation.
//!
//! ## Usage
//!
//! ```sh
//! bill_trends crawl                 # listing + detail pages, PDF downloads
//! bill_trends keywords              # TF-IDF keywords per bill PDF
//! bill_trends trends                # search-trend score per keyword
//! bill_trends news                  # daily news counts per top keyword
//! bill_trends plot trends|news      # SVG charts
//! ```
//!
//! ## Architecture
//!
//! 1. **Crawl**: listing pages → detail pages → PDF downloads → `bill/data.tsv`
//! 2. **Keywords**: PDFs → nouns → TF-IDF → `bill/pdf_keywords.tsv`
//! 3. **Trends**: keyword table → DataLab API → `naver_trends/keyword_trends.tsv`
//! 4. **News**: keyword table → news API, one query per day → `news/news_count.tsv`
//! 5. **Plot**: trend or news table → `charts/*.svg`

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod keywords;
mod models;
mod news;
mod outputs;
mod policy;
mod scrapers;
mod trends;
mod tsv;
mod utils;

use cli::{Cli, Command};
use config::Config;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("bill_trends starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.data_dir, command = ?args.command, "Parsed CLI arguments");

    let config = Config::load(args.config.as_deref())?.with_overrides(&args);
    let today = Local::now().date_naive();
    info!(data_dir = %config.paths.data_dir.display(), %today, "Configuration ready");

    match &args.command {
        Command::Crawl(_) => scrapers::run(&config).await?,
        Command::Keywords(_) => keywords::run(&config).await?,
        Command::Trends(_) => trends::run(&config, today).await?,
        Command::News(_) => news::run(&config, today).await?,
        Command::Plot { chart } => {
            let written = outputs::run(&config, *chart)?;
            info!(charts = written.len(), "Charts rendered");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
