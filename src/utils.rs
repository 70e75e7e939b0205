//! Small helpers shared by the stages: date ranges, score rounding and
//! formatting, log-friendly truncation and output directory checks.

use chrono::{Duration, NaiveDate};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Every calendar day from `start` through `end`, both inclusive. Empty
/// when `start` is after `end`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let count = (end - start).num_days().max(-1) + 1;
    (0..count).map(move |n| start + Duration::days(n))
}

/// Round to two decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Format a score the way the tables store it: integral values keep one
/// decimal (`42.0`), others print as-is (`15.25`).
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_score(42.0), "42.0");
/// assert_eq!(format_score(15.25), "15.25");
/// ```
pub fn format_score(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        x.to_string()
    }
}

/// Collapse runs of whitespace to one space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes on a character boundary and
/// get `"…(+N bytes)"` appended.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of bytes to keep
///
/// # Returns
///
/// `s` unchanged if it fits, otherwise the cut prefix with the byte count
/// of the rest.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("의안", 4), "의…(+3 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Arguments
///
/// * `path` - Directory to check
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::File::create(&probe_path).await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Directory is writable");
    Ok(())
}
