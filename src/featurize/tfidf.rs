//! Tf-idf text vectorization.

use std::collections::{HashMap, HashSet};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::dataset::FeatureTable;
use crate::error::{Result, SieveError};

/// Configuration for tf-idf extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfConfig {
    /// Lowercase the text before tokenizing.
    pub lowercase: bool,
    /// Tokens shorter than this many bytes are dropped.
    pub min_token_length: usize,
    /// Drop any token that contains a digit.
    pub skip_numeric: bool,
    /// Keep only the terms with the highest document frequency.
    pub max_features: Option<usize>,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum fraction of documents a term may appear in.
    pub max_df: f64,
    /// Replace raw counts with `1 + ln(count)`.
    pub sublinear_tf: bool,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            min_token_length: 2,
            skip_numeric: true,
            max_features: None,
            min_df: 1,
            max_df: 1.0,
            sublinear_tf: false,
        }
    }
}

/// Tf-idf vectorizer with smooth idf and l2-normalized rows.
///
/// The learned vocabulary is sorted alphabetically, so column order is
/// stable across runs regardless of hash map iteration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    vocabulary: Vec<String>,
    term_index: HashMap<String, usize>,
    idf: Option<Array1<f64>>,
}

impl TfidfVectorizer {
    pub fn new(config: TfidfConfig) -> Self {
        Self {
            config,
            vocabulary: Vec::new(),
            term_index: HashMap::new(),
            idf: None,
        }
    }

    pub fn with_max_features(mut self, n: usize) -> Self {
        self.config.max_features = Some(n);
        self
    }

    pub fn with_min_df(mut self, min_df: usize) -> Self {
        self.config.min_df = min_df;
        self
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let processed = if self.config.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        processed
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .filter(|s| s.len() >= self.config.min_token_length)
            .filter(|s| !self.config.skip_numeric || !s.chars().any(|c| c.is_numeric()))
            .map(|s| s.to_string())
            .collect()
    }

    /// Learn the vocabulary and idf weights from a document corpus.
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        let n_docs = documents.len();
        if n_docs == 0 {
            return Err(SieveError::DataError(
                "cannot fit a vectorizer on an empty corpus".to_string(),
            ));
        }
        let max_df_count = (self.config.max_df * n_docs as f64).ceil() as usize;

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let tokens = self.tokenize(doc);
            let unique: HashSet<&String> = tokens.iter().collect();
            for token in unique {
                *doc_freq.entry(token.clone()).or_insert(0) += 1;
            }
        }

        let mut filtered: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= self.config.min_df && *df <= max_df_count)
            .collect();

        if let Some(max_n) = self.config.max_features {
            // Highest document frequency first, alphabetical within
            // ties so the cut is deterministic.
            filtered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            filtered.truncate(max_n);
        }
        filtered.sort_by(|a, b| a.0.cmp(&b.0));

        let n = n_docs as f64;
        let idf: Array1<f64> = filtered
            .iter()
            .map(|(_, df)| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        self.vocabulary = filtered.into_iter().map(|(term, _)| term).collect();
        self.term_index = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
        self.idf = Some(idf);

        Ok(())
    }

    /// Weight a document batch against the learned vocabulary. Terms
    /// never seen during `fit` are ignored.
    pub fn transform(&self, documents: &[String]) -> Result<Array2<f64>> {
        let idf = self.idf.as_ref().ok_or(SieveError::ModelNotFitted)?;

        let n_docs = documents.len();
        let mut matrix: Array2<f64> = Array2::zeros((n_docs, self.vocabulary.len()));

        for (doc_idx, doc) in documents.iter().enumerate() {
            for token in self.tokenize(doc) {
                if let Some(&term_idx) = self.term_index.get(&token) {
                    matrix[[doc_idx, term_idx]] += 1.0;
                }
            }
        }

        if self.config.sublinear_tf {
            matrix.mapv_inplace(|v| if v > 0.0 { 1.0 + v.ln() } else { 0.0 });
        }

        for mut row in matrix.rows_mut() {
            row *= &idf.view();
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row /= norm;
            }
        }

        Ok(matrix)
    }

    pub fn fit_transform(&mut self, documents: &[String]) -> Result<Array2<f64>> {
        self.fit(documents)?;
        self.transform(documents)
    }

    /// Learned terms in column order. Empty until fitted.
    pub fn feature_names(&self) -> &[String] {
        &self.vocabulary
    }
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new(TfidfConfig::default())
    }
}

/// Assemble a weighted term matrix and a label column into the table
/// shape the selection harness consumes.
pub fn to_table(
    matrix: Array2<f64>,
    names: Vec<String>,
    labels: Array1<f64>,
    label_name: &str,
) -> Result<FeatureTable> {
    FeatureTable::new(names, matrix, label_name, labels)
}
