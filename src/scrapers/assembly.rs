//! Listing and detail page scraping for recently passed bills.
//!
//! # Page structure
//!
//! - Listing rows live under `div.tableCol01 table tbody tr`; columns 0, 1,
//!   3 and 5 hold the bill number, name, proposal date and resolution date.
//!   The name cell links to the detail page through an inline
//!   `fGoDetail('<billId>', ...)` call.
//! - The detail page's first `div.contIn div.tableCol01 table tbody` row
//!   lists attachments in its fourth cell; the PDF is the anchor wrapping an
//!   image whose `src` mentions `pdf`.

use crate::config::{Config, CrawlerConfig};
use crate::error::CrawlError;
use crate::models::{BillRecord, bills_to_table};
use crate::scrapers::download;
use crate::utils::{collapse_whitespace, ensure_writable_dir};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Listing rows need at least this many cells to be read.
const MIN_LISTING_COLUMNS: usize = 7;
const ATTACHMENT_COLUMN: usize = 3;

static LISTING_ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.tableCol01 table tbody tr").unwrap());
static DETAIL_ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.contIn div.tableCol01 table tbody tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

static BILL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"fGoDetail\('([^']+)'").unwrap());
static QUOTED_ARG: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).unwrap());
static HANDLER_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][\w$.]*\s*\(").unwrap());

/// The fields read from one listing row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingRow {
    pub bill_no: String,
    pub name: String,
    pub proposal_date: String,
    pub resolution_date: String,
    /// Site-internal id used to address the detail page.
    pub bill_id: Option<String>,
}

fn cell_text(cell: &ElementRef) -> String {
    collapse_whitespace(&cell.text().collect::<String>())
}

/// Bill id from an inline `fGoDetail('...')` call.
pub fn extract_bill_id(script: &str) -> Option<String> {
    BILL_ID
        .captures(script)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse every listing row with enough columns. Shorter rows (headers,
/// "no results" placeholders) are skipped.
pub fn parse_listing(html: &str) -> Vec<ListingRow> {
    let document = Html::parse_document(html);
    let mut rows = Vec::new();

    for tr in document.select(&LISTING_ROWS) {
        let cells: Vec<ElementRef> = tr.select(&CELL).collect();
        if cells.len() < MIN_LISTING_COLUMNS {
            continue;
        }

        let bill_id = cells[1].select(&ANCHOR).next().and_then(|a| {
            let attrs = a.value();
            attrs
                .attr("href")
                .and_then(extract_bill_id)
                .or_else(|| attrs.attr("onclick").and_then(extract_bill_id))
        });

        rows.push(ListingRow {
            bill_no: cell_text(&cells[0]),
            name: cell_text(&cells[1]),
            proposal_date: cell_text(&cells[3]),
            resolution_date: cell_text(&cells[5]),
            bill_id,
        });
    }

    rows
}

/// URL of listing page `page` (1-based). Page 1 is the start URL itself.
pub fn listing_page_url(start: &str, page_param: &str, page: u32) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(start)?;
    if page > 1 {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != page_param)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(page_param, &page.to_string());
    }
    Ok(url)
}

pub fn detail_url(base: &str, bill_id: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(base, &[("billId", bill_id)])
}

/// The raw link of the PDF attachment on a detail page: the anchor's
/// `href`, or its `onclick` handler when the `href` is a placeholder.
///
/// Fails when the page has no attachment row at all.
pub fn find_pdf_link(html: &str) -> Result<Option<String>, CrawlError> {
    let document = Html::parse_document(html);
    let row = document
        .select(&DETAIL_ROWS)
        .next()
        .ok_or(CrawlError::MissingDetailRow)?;
    let Some(cell) = row.select(&CELL).nth(ATTACHMENT_COLUMN) else {
        return Ok(None);
    };

    for a in cell.select(&ANCHOR) {
        let is_pdf = a.select(&IMAGE).any(|img| {
            img.value()
                .attr("src")
                .is_some_and(|src| src.to_lowercase().contains("pdf"))
        });
        if !is_pdf {
            continue;
        }
        let attrs = a.value();
        let href = attrs
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty() && *h != "#" && !h.starts_with("javascript:void"));
        if let Some(link) = href.or_else(|| attrs.attr("onclick").map(str::trim)) {
            return Ok(Some(link.to_string()));
        }
    }
    Ok(None)
}

/// Turn a raw attachment link into an absolute URL.
///
/// Plain links are joined against `page`. Script links (`javascript:...`
/// or an `onclick` body starting with a function call) resolve to their
/// first quoted argument that looks like a URL or an absolute path.
///
/// # Arguments
///
/// * `page` - URL of the detail page the link was found on
/// * `raw` - the `href` or `onclick` text from [`find_pdf_link`]
///
/// # Returns
///
/// The absolute URL, or `None` when a script link carries no usable
/// argument.
pub fn resolve_link(page: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    let is_script = raw.starts_with("javascript:") || HANDLER_CALL.is_match(raw);
    if !is_script {
        return page.join(raw).ok();
    }
    QUOTED_ARG
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|arg| arg.starts_with("http://") || arg.starts_with("https://") || arg.starts_with('/'))
        .and_then(|arg| page.join(arg).ok())
}

/// Sequential crawler over listing pages, detail pages and downloads.
#[derive(Debug)]
pub struct Crawler<'a> {
    client: Client,
    config: &'a CrawlerConfig,
    download_dir: PathBuf,
}

impl<'a> Crawler<'a> {
    pub fn new(config: &'a CrawlerConfig, download_dir: PathBuf) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            config,
            download_dir,
        })
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, reqwest::Error> {
        self.client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    /// Visit listing pages in order, pushing one record per row into
    /// `bills` as it is completed.
    ///
    /// A first page that cannot be loaded is an error; a later one ends
    /// pagination. Rows already pushed stay in `bills` either way.
    #[instrument(level = "info", skip_all, fields(max_pages = self.config.max_pages))]
    pub async fn crawl_into(&self, bills: &mut Vec<BillRecord>) -> Result<(), CrawlError> {
        let mut previous_first: Option<String> = None;

        for page in 1..=self.config.max_pages {
            let url = listing_page_url(&self.config.listing_url, &self.config.page_param, page)?;
            let html = match self.fetch_html(&url).await {
                Ok(html) => html,
                Err(e) if page == 1 => {
                    return Err(CrawlError::Listing {
                        page,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(page, error = %e, "Could not load listing page; stopping pagination");
                    break;
                }
            };

            let rows = parse_listing(&html);
            if page > 1 && rows.is_empty() {
                info!(page, "Listing page has no rows; stopping pagination");
                break;
            }
            let first = rows.first().map(|r| r.bill_no.clone());
            if page > 1 && first.is_some() && first == previous_first {
                warn!(page, "Listing page repeats the previous page; stopping pagination");
                break;
            }
            previous_first = first;

            info!(page, rows = rows.len(), %url, "Processing listing page");
            for row in rows {
                let bill = self.process_row(row).await;
                bills.push(bill);
                sleep(self.config.row_delay()).await;
            }

            if page < self.config.max_pages {
                sleep(self.config.page_delay()).await;
            }
        }

        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(bill = %row.bill_no))]
    async fn process_row(&self, row: ListingRow) -> BillRecord {
        let mut bill = BillRecord {
            bill_no: row.bill_no,
            name: row.name,
            proposal_date: row.proposal_date,
            resolution_date: row.resolution_date,
            ..Default::default()
        };

        let Some(bill_id) = row.bill_id else {
            debug!("Row has no detail link");
            return bill;
        };
        let url = match detail_url(&self.config.detail_url, &bill_id) {
            Ok(url) => url,
            Err(e) => {
                warn!(%bill_id, error = %e, "Could not build detail URL");
                return bill;
            }
        };
        bill.detail_url = url.to_string();

        match self.fetch_pdf(&bill.bill_no, &url).await {
            Ok(Some(path)) => {
                info!(path = %path.display(), "Downloaded bill PDF");
                bill.pdf_path = path.display().to_string();
            }
            Ok(None) => debug!("No PDF found for bill"),
            Err(e) => warn!(detail_url = %url, error = %e, "Detail page failed"),
        }
        bill
    }

    async fn fetch_pdf(&self, bill_no: &str, detail: &Url) -> Result<Option<PathBuf>, CrawlError> {
        let html = self.fetch_html(detail).await?;
        let Some(raw) = find_pdf_link(&html)? else {
            return Ok(None);
        };
        let target =
            resolve_link(detail, &raw).ok_or_else(|| CrawlError::UnresolvedLink(raw.clone()))?;

        let mut before = download::snapshot(&self.download_dir)?;
        let written =
            download::download_pdf(&self.client, &target, bill_no, &self.download_dir).await?;
        // A re-run overwrites the file under the same name; it still counts as new.
        if let Some(name) = written.file_name() {
            before.remove(name);
        }
        let found = download::wait_for_new_file(
            &self.download_dir,
            &before,
            self.config.download_timeout(),
            self.config.download_poll(),
        )
        .await?;
        if found.is_none() {
            warn!(%target, "No new file appeared in the download directory");
        }
        Ok(found)
    }
}

fn write_bills(bills: &[BillRecord], path: &Path) -> Result<(), CrawlError> {
    if bills.is_empty() {
        warn!("No bills collected; bill table not written");
        return Ok(());
    }
    bills_to_table(bills).write(path)?;
    info!(count = bills.len(), path = %path.display(), "Saved bill table");
    Ok(())
}

/// Crawl stage entry point.
///
/// The bill table is written after the crawl whatever its outcome, as long
/// as at least one row was collected; a fatal crawl error is returned after
/// that write.
///
/// # Arguments
///
/// * `config` - run configuration; uses `config.crawler` and the bill table
///   and PDF directory paths
///
/// # Errors
///
/// Returns [`CrawlError`] if the PDF directory is not writable, the first
/// listing page cannot be loaded, or the bill table cannot be written.
#[instrument(level = "info", skip_all)]
pub async fn run(config: &Config) -> Result<(), CrawlError> {
    let download_dir = config.paths.pdf_dir();
    ensure_writable_dir(&download_dir).await?;

    let crawler = Crawler::new(&config.crawler, download_dir)?;
    let mut bills = Vec::new();
    let outcome = crawler.crawl_into(&mut bills).await;
    if let Err(e) = &outcome {
        error!(error = %e, collected = bills.len(), "Crawl aborted");
    }

    write_bills(&bills, &config.paths.bills())?;
    outcome
}
