//! Crawler for the National Assembly bill information site.
//!
//! The crawl follows the site's own navigation:
//!
//! 1. **Listing**: read bill rows from each listing page ([`assembly`])
//! 2. **Detail**: open each bill's detail page and find its PDF attachment
//! 3. **Download**: fetch the PDF into the download directory and discover
//!    the new file by polling the directory ([`download`])
//!
//! Per-row failures leave the affected fields blank. Whatever was collected
//! is written to the bill table at the end of the run, even when the crawl
//! stops early.

pub mod assembly;
pub mod download;

pub use assembly::run;
