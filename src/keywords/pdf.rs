//! PDF text extraction.

use crate::error::KeywordError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `*.pdf` files directly inside `dir`, sorted by file name.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, KeywordError> {
    let io_err = |source| KeywordError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Extract the text of every page, cleaned and trimmed.
pub fn extract_text(path: &Path) -> Result<String, KeywordError> {
    let bytes = std::fs::read(path).map_err(|source| KeywordError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| KeywordError::Extraction {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let cleaned = clean_pdf_text(&text);
    debug!(path = %path.display(), chars = cleaned.chars().count(), "Extracted PDF text");
    Ok(cleaned)
}

/// [`extract_text`] on the blocking pool. A panic inside the PDF parser is
/// reported as an extraction failure of that file.
pub async fn extract_text_blocking(path: PathBuf) -> Result<String, KeywordError> {
    let worker_path = path.clone();
    match tokio::task::spawn_blocking(move || extract_text(&worker_path)).await {
        Ok(result) => result,
        Err(e) => Err(KeywordError::Extraction {
            path,
            reason: format!("extractor aborted: {e}"),
        }),
    }
}

fn clean_pdf_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .replace('\u{0}', "")
        .replace('\u{FEFF}', "")
}
