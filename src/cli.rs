//! Command-line interface definitions for bill_trends.
//!
//! Each pipeline stage is a subcommand. Stages only share files under the
//! data directory, so they can be run one at a time, in order:
//!
//! ```sh
//! bill_trends crawl
//! bill_trends keywords
//! CLIENT_ID=... CLIENT_SECRET=... bill_trends trends
//! NEWS_URL=https://newsapi.org/v2/everything NEWS_API_KEY=... bill_trends news
//! bill_trends plot trends
//! bill_trends plot news
//! ```

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory for tables, downloads and charts
    #[arg(short, long, global = true, env = "BILL_TRENDS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl recently passed bills and download their PDFs
    Crawl(CrawlArgs),
    /// Extract TF-IDF keywords from the downloaded PDFs
    Keywords(KeywordArgs),
    /// Score each keyword against the search-trend API
    Trends(TrendArgs),
    /// Count daily news articles for each bill's top keyword
    News(NewsArgs),
    /// Render charts from the trend or news table
    Plot {
        #[command(subcommand)]
        chart: PlotCommand,
    },
}

#[derive(Args, Debug, Default)]
pub struct CrawlArgs {
    /// Maximum number of listing pages to visit
    #[arg(long)]
    pub max_pages: Option<u32>,
}

#[derive(Args, Debug, Default)]
pub struct KeywordArgs {
    /// Keywords kept per bill
    #[arg(long)]
    pub top_n: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct TrendArgs {
    /// Trend API client id
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    /// Trend API client secret
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct NewsArgs {
    /// News search endpoint
    #[arg(long, env = "NEWS_URL")]
    pub news_url: Option<String>,

    /// News API key, sent as `X-Api-Key`
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// First day to query (YYYY-MM-DD); the range runs through today
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotCommand {
    /// Heatmap, mean bar chart and per-keyword box plot of trend scores
    Trends,
    /// Daily news counts per bill keyword
    News,
}
