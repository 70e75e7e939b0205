//! PDF download and download-directory polling.
//!
//! A download is detected the same way a browser download would be: take a
//! listing of the download directory, start the download, then poll the
//! directory until a file that was not in the listing shows up. Files put
//! there by another process in the meantime would be picked up too.

use crate::error::CrawlError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_DISPOSITION;
use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument};
use url::Url;

/// Suffixes of files that are still being written.
const PARTIAL_SUFFIXES: [&str; 3] = [".crdownload", ".part", ".tmp"];

static FILENAME_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)filename\*\s*=\s*(?:[\w-]+)?'[^']*'([^;]+)").unwrap());
static FILENAME_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)filename\s*=\s*"([^"]+)""#).unwrap());
static FILENAME_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)filename\s*=\s*([^;\s]+)").unwrap());

/// Names of the entries currently in `dir`.
pub fn snapshot(dir: &Path) -> io::Result<HashSet<OsString>> {
    std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect()
}

fn is_partial(name: &OsString) -> bool {
    let name = name.to_string_lossy();
    PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Poll `dir` every `poll` until an entry not in `before` appears, for at
/// most `timeout`. Returns the path of the first such entry in name order,
/// or `None` when the window closes first.
#[instrument(level = "debug", skip_all, fields(dir = %dir.display()))]
pub async fn wait_for_new_file(
    dir: &Path,
    before: &HashSet<OsString>,
    timeout: Duration,
    poll: Duration,
) -> io::Result<Option<PathBuf>> {
    let poll_ms = poll.as_millis().max(1);
    let attempts = (timeout.as_millis() / poll_ms).max(1);

    for attempt in 1..=attempts {
        sleep(poll).await;
        let now = snapshot(dir)?;
        let mut fresh: Vec<&OsString> = now
            .difference(before)
            .filter(|name| !is_partial(name))
            .collect();
        fresh.sort();
        if let Some(name) = fresh.first() {
            debug!(attempt, name = %name.to_string_lossy(), "New file found");
            return Ok(Some(dir.join(name)));
        }
    }
    Ok(None)
}

/// File name announced by a `Content-Disposition` header. The RFC 5987
/// `filename*` form wins over plain `filename`; percent-encoding is decoded
/// in both.
pub fn file_name_from_disposition(header: &str) -> Option<String> {
    let raw = FILENAME_EXT
        .captures(header)
        .or_else(|| FILENAME_QUOTED.captures(header))
        .or_else(|| FILENAME_BARE.captures(header))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())?;
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    Some(decoded)
}

fn sanitize(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    base.chars()
        .filter(|c| !c.is_control() && *c != ':')
        .collect::<String>()
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// Name to store a bill's PDF under. Always starts with the bill number so
/// the keyword stage can recover it from the file name.
pub fn download_file_name(bill_no: &str, disposition: Option<&str>, url: &Url) -> String {
    let announced = disposition
        .and_then(file_name_from_disposition)
        .or_else(|| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| s.to_lowercase().ends_with(".pdf"))
                .map(|s| {
                    urlencoding::decode(s)
                        .map(|d| d.into_owned())
                        .unwrap_or_else(|_| s.to_string())
                })
        })
        .map(|n| sanitize(&n))
        .filter(|n| !n.is_empty());

    let bill_no = sanitize(bill_no);
    match announced {
        Some(name) if name.starts_with(&bill_no) => name,
        Some(name) => format!("{bill_no}_{name}"),
        None => format!("{bill_no}.pdf"),
    }
}

/// Fetch `url` and store the body in `dir`.
///
/// # Arguments
///
/// * `client` - HTTP client shared with the crawler
/// * `url` - absolute PDF URL
/// * `bill_no` - bill number the stored name must start with
/// * `dir` - download directory; an existing file of the same name is
///   replaced
///
/// # Returns
///
/// The path written, named by [`download_file_name`].
///
/// # Errors
///
/// Returns [`CrawlError`] on a failed or non-2xx request, or when the file
/// cannot be written.
#[instrument(level = "info", skip_all, fields(%url, %bill_no))]
pub async fn download_pdf(
    client: &Client,
    url: &Url,
    bill_no: &str,
    dir: &Path,
) -> Result<PathBuf, CrawlError> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    let disposition = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
    let name = download_file_name(bill_no, disposition.as_deref(), url);
    let bytes = response.bytes().await?;

    let path = dir.join(name);
    tokio::fs::write(&path, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Saved download");
    Ok(path)
}
