//! Keyword extraction from downloaded bill PDFs.
//!
//! Every PDF in the download directory becomes one document: its text is
//! extracted, reduced to noun tokens, and the documents are weighted with
//! TF-IDF. The heaviest terms of each document are its keywords.
//!
//! - [`pdf`]: listing and text extraction
//! - [`tokenize`]: noun tokenizer
//! - [`tfidf`]: vectorizer and ranking

pub mod pdf;
pub mod tfidf;
pub mod tokenize;

use crate::config::Config;
use crate::error::KeywordError;
use crate::models::{BillNo, KeywordRecord, keywords_to_table};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tfidf::TfidfVectorizer;
use tokenize::{HangulNounTokenizer, NounTokenizer};
use tracing::{debug, info, instrument, warn};

/// One PDF that yielded text and at least one noun.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub bill_no: BillNo,
    pub file_name: String,
    pub tokens: Vec<String>,
}

/// Turn one PDF's text into a [`Document`]. `None` when the file name has
/// no bill number or the text has no nouns.
pub fn build_document<T: NounTokenizer>(
    path: &Path,
    text: &str,
    tokenizer: &T,
) -> Option<Document> {
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let Some(bill_no) = BillNo::from_file_name(&file_name) else {
        warn!(file = %file_name, "File name carries no bill number; skipping");
        return None;
    };
    if text.trim().is_empty() {
        warn!(file = %file_name, "No text extracted; skipping");
        return None;
    }
    let tokens = tokenizer.nouns(text);
    if tokens.is_empty() {
        warn!(file = %file_name, "No nouns found; skipping");
        return None;
    }
    debug!(file = %file_name, tokens = tokens.len(), "Tokenized document");
    Some(Document {
        bill_no,
        file_name,
        tokens,
    })
}

/// Extract and tokenize `paths` one after another, dropping files that
/// fail or yield nothing.
#[instrument(level = "info", skip_all, fields(files = paths.len()))]
pub async fn load_documents<T: NounTokenizer>(paths: Vec<PathBuf>, tokenizer: &T) -> Vec<Document> {
    let docs: Vec<Option<Document>> = stream::iter(paths)
        .then(|path| async move {
            match pdf::extract_text_blocking(path.clone()).await {
                Ok(text) => build_document(&path, &text, tokenizer),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "PDF extraction failed; skipping");
                    None
                }
            }
        })
        .collect()
        .await;
    docs.into_iter().flatten().collect()
}

/// Rank the keywords of every document.
pub fn extract_keywords(
    documents: &[Document],
    vectorizer: &TfidfVectorizer,
    top_n: usize,
) -> Result<Vec<KeywordRecord>, KeywordError> {
    let corpus: Vec<Vec<String>> = documents.iter().map(|d| d.tokens.clone()).collect();
    let matrix = vectorizer.fit_transform(&corpus)?;
    info!(documents = matrix.documents(), terms = matrix.terms().len(), "Built TF-IDF matrix");

    Ok(documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let keywords: Vec<String> = matrix
                .top_terms(i, top_n)
                .into_iter()
                .map(str::to_string)
                .collect();
            debug!(bill_no = %doc.bill_no, ?keywords, "Ranked keywords");
            KeywordRecord {
                bill_no: doc.bill_no.clone(),
                keywords,
            }
        })
        .collect())
}

/// Run the keyword stage: PDFs in the download directory to the keyword
/// table.
///
/// When no PDF survives extraction and tokenization nothing is written.
///
/// # Errors
///
/// Returns [`KeywordError`] if the PDF directory cannot be listed, the
/// TF-IDF bounds leave no vocabulary, or the table cannot be written.
#[instrument(level = "info", skip_all)]
pub async fn run(config: &Config) -> Result<(), KeywordError> {
    let pdf_dir = config.paths.pdf_dir();
    let paths = pdf::list_pdfs(&pdf_dir)?;
    info!(dir = %pdf_dir.display(), count = paths.len(), "Found PDFs");

    let documents = load_documents(paths, &HangulNounTokenizer).await;
    if documents.is_empty() {
        warn!("No usable documents; keyword table not written");
        return Ok(());
    }

    let settings = &config.keywords;
    let vectorizer = TfidfVectorizer::new(settings.min_df, settings.max_df);
    let records = extract_keywords(&documents, &vectorizer, settings.top_n)?;

    let out = config.paths.keywords();
    keywords_to_table(&records, settings.top_n).write(&out)?;
    info!(path = %out.display(), rows = records.len(), "Wrote keyword table");
    Ok(())
}
