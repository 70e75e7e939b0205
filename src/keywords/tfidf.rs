//! TF-IDF weighting over a small document collection.
//!
//! Weights follow the common smoothed formulation:
//!
//! ```text
//! idf(t)    = ln((1 + n) / (1 + df(t))) + 1
//! w(d, t)   = count(d, t) * idf(t)          then each row is L2-normalized
//! ```
//!
//! Terms are lower-cased and must be at least two characters long. The
//! vocabulary keeps terms found in at least `min_df` documents and in at
//! most `max_df * n` documents, and is sorted lexicographically.

use crate::error::KeywordError;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TfidfVectorizer {
    /// Minimum document count.
    pub min_df: usize,
    /// Maximum document share, in `0.0..=1.0`.
    pub max_df: f64,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self {
            min_df: 2,
            max_df: 0.95,
        }
    }
}

/// Sparse document-term matrix. Each row lists `(term index, weight)`
/// pairs in term order.
#[derive(Debug, Clone, PartialEq)]
pub struct TfidfMatrix {
    terms: Vec<String>,
    #[cfg(test)]
    idf: Vec<f64>,
    rows: Vec<Vec<(usize, f64)>>,
}

fn analyze(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() >= 2)
        .collect()
}

impl TfidfVectorizer {
    pub fn new(min_df: usize, max_df: f64) -> Self {
        Self { min_df, max_df }
    }

    /// Learn the vocabulary and idf from `documents` and weight them.
    pub fn fit_transform(&self, documents: &[Vec<String>]) -> Result<TfidfMatrix, KeywordError> {
        let n = documents.len();
        let max_count = self.max_df * n as f64;
        if max_count < self.min_df as f64 {
            return Err(KeywordError::DocumentFrequencyBounds {
                max: max_count,
                min: self.min_df,
            });
        }

        let counts: Vec<HashMap<String, usize>> = documents
            .iter()
            .map(|doc| {
                let mut tf = HashMap::new();
                for term in analyze(doc) {
                    *tf.entry(term).or_insert(0) += 1;
                }
                tf
            })
            .collect();

        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for tf in &counts {
            for term in tf.keys() {
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let (terms, idf): (Vec<String>, Vec<f64>) = df
            .into_iter()
            .filter(|&(_, d)| d >= self.min_df && d as f64 <= max_count)
            .map(|(term, d)| {
                let idf = ((1 + n) as f64 / (1 + d) as f64).ln() + 1.0;
                (term.to_string(), idf)
            })
            .unzip();
        if terms.is_empty() {
            return Err(KeywordError::EmptyVocabulary);
        }

        let index: HashMap<&str, usize> = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let rows = counts
            .iter()
            .map(|tf| {
                let mut row: Vec<(usize, f64)> = tf
                    .iter()
                    .filter_map(|(term, &c)| index.get(term.as_str()).map(|&i| (i, c as f64 * idf[i])))
                    .collect();
                row.sort_by_key(|&(i, _)| i);
                let norm = row.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in &mut row {
                        *w /= norm;
                    }
                }
                row
            })
            .collect();

        Ok(TfidfMatrix {
            terms,
            #[cfg(test)]
            idf,
            rows,
        })
    }
}

impl TfidfMatrix {
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    #[cfg(test)]
    pub fn idf(&self, term: &str) -> Option<f64> {
        let i = self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()?;
        Some(self.idf[i])
    }

    /// Number of documents (matrix rows).
    pub fn documents(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn weight(&self, doc: usize, term: &str) -> f64 {
        let Ok(i) = self.terms.binary_search_by(|t| t.as_str().cmp(term)) else {
            return 0.0;
        };
        self.rows
            .get(doc)
            .and_then(|row| row.iter().find(|&&(j, _)| j == i))
            .map_or(0.0, |&(_, w)| w)
    }

    /// Up to `n` terms of document `doc` with a positive weight, heaviest
    /// first. Equal weights keep lexicographic term order.
    pub fn top_terms(&self, doc: usize, n: usize) -> Vec<&str> {
        let Some(row) = self.rows.get(doc) else {
            return Vec::new();
        };
        let mut ranked: Vec<&(usize, f64)> = row.iter().filter(|(_, w)| *w > 0.0).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(n)
            .map(|&(i, _)| self.terms[i].as_str())
            .collect()
    }
}
