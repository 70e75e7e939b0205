//! Run configuration, built once in `main` and handed to each stage.
//!
//! Values come from three layers, later ones winning:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. an optional YAML file (`--config config.yaml`); any field may be omitted
//! 3. command-line flags and their environment variables (see [`crate::cli`])
//!
//! ```yaml
//! paths:
//!   data_dir: ./data
//! crawler:
//!   max_pages: 3
//! news:
//!   start_date: 2025-06-01
//!   on_failure: omit
//! ```

use crate::cli::{Cli, Command};
use crate::error::ConfigError;
use crate::policy::FailurePolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: Paths,
    pub crawler: CrawlerConfig,
    pub keywords: KeywordConfig,
    pub trends: TrendConfig,
    pub news: NewsConfig,
}

/// Table and directory locations. Relative entries resolve against
/// `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub data_dir: PathBuf,
    pub bills: PathBuf,
    pub pdf_dir: PathBuf,
    pub keywords: PathBuf,
    pub trends: PathBuf,
    pub news: PathBuf,
    pub charts: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            bills: PathBuf::from("bill/data.tsv"),
            pdf_dir: PathBuf::from("bill/pdf"),
            keywords: PathBuf::from("bill/pdf_keywords.tsv"),
            trends: PathBuf::from("naver_trends/keyword_trends.tsv"),
            news: PathBuf::from("news/news_count.tsv"),
            charts: PathBuf::from("charts"),
        }
    }
}

impl Paths {
    fn resolve(&self, rel: &Path) -> PathBuf {
        self.data_dir.join(rel)
    }

    pub fn bills(&self) -> PathBuf {
        self.resolve(&self.bills)
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.resolve(&self.pdf_dir)
    }

    pub fn keywords(&self) -> PathBuf {
        self.resolve(&self.keywords)
    }

    pub fn trends(&self) -> PathBuf {
        self.resolve(&self.trends)
    }

    pub fn news(&self) -> PathBuf {
        self.resolve(&self.news)
    }

    pub fn charts(&self) -> PathBuf {
        self.resolve(&self.charts)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// First listing page of recently passed bills.
    pub listing_url: String,
    /// Detail page; the bill id is appended as `billId`.
    pub detail_url: String,
    /// Query parameter selecting listing pages after the first.
    pub page_param: String,
    pub max_pages: u32,
    pub user_agent: String,
    pub request_timeout_ms: u64,
    pub row_delay_ms: u64,
    pub page_delay_ms: u64,
    pub download_timeout_ms: u64,
    pub download_poll_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://likms.assembly.go.kr/bill/LatestPassedBill.do".into(),
            detail_url: "https://likms.assembly.go.kr/bill/billDetail.do".into(),
            page_param: "currentPage".into(),
            max_pages: 10,
            user_agent: concat!(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
                "(KHTML, like Gecko) Chrome/124.0 Safari/537.36"
            )
            .into(),
            request_timeout_ms: 15_000,
            row_delay_ms: 1_000,
            page_delay_ms: 2_000,
            download_timeout_ms: 15_000,
            download_poll_ms: 500,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn download_poll(&self) -> Duration {
        Duration::from_millis(self.download_poll_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Keywords kept per document.
    pub top_n: usize,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum share of documents a term may appear in.
    pub max_df: f64,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            min_df: 2,
            max_df: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub endpoint: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Length of the window ending today.
    pub window_days: i64,
    /// `date`, `week` or `month`.
    pub time_unit: String,
    /// Keyword columns read from the keyword table.
    pub slots: usize,
    pub on_failure: FailurePolicy,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openapi.naver.com/v1/datalab/search".into(),
            client_id: None,
            client_secret: None,
            window_days: 60,
            time_unit: "date".into(),
            slots: 5,
            on_failure: FailurePolicy::ZeroFill,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// First day queried; the range runs through today.
    pub start_date: NaiveDate,
    pub language: String,
    pub request_delay_ms: u64,
    pub on_failure: FailurePolicy,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            start_date: NaiveDate::from_ymd_opt(2025, 5, 25).unwrap_or_default(),
            language: "ko".into(),
            request_delay_ms: 1_000,
            on_failure: FailurePolicy::Omit,
        }
    }
}

impl NewsConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Config {
    /// Load defaults, then the YAML file at `path` if one is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Apply command-line flags (and the environment variables behind them).
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(dir) = &cli.data_dir {
            self.paths.data_dir = dir.clone();
        }
        match &cli.command {
            Command::Crawl(args) => {
                if let Some(pages) = args.max_pages {
                    self.crawler.max_pages = pages;
                }
            }
            Command::Keywords(args) => {
                if let Some(top_n) = args.top_n {
                    self.keywords.top_n = top_n;
                }
            }
            Command::Trends(args) => {
                if args.client_id.is_some() {
                    self.trends.client_id = args.client_id.clone();
                }
                if args.client_secret.is_some() {
                    self.trends.client_secret = args.client_secret.clone();
                }
            }
            Command::News(args) => {
                if args.news_url.is_some() {
                    self.news.endpoint = args.news_url.clone();
                }
                if args.api_key.is_some() {
                    self.news.api_key = args.api_key.clone();
                }
                if let Some(start) = args.start_date {
                    self.news.start_date = start;
                }
            }
            Command::Plot { .. } => {}
        }
        self
    }
}
