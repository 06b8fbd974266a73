//! Fitted TF-IDF vectorizer

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Default token pattern: words of two or more characters
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Row normalisation applied after weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    L2,
    None,
}

/// Sparse vector with strictly ascending indices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j, mut acc) = (0, 0, 0.0);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// Cosine similarity, 0 when either side is all zeros
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            0.0
        } else {
            self.dot(other) / denom
        }
    }

    /// Check shape against a vocabulary of `dim` terms
    pub fn validate(&self, dim: usize) -> Result<(), String> {
        if self.indices.len() != self.values.len() {
            return Err(format!(
                "{} indices but {} values",
                self.indices.len(),
                self.values.len()
            ));
        }
        if self.indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err("indices are not strictly ascending".to_string());
        }
        if let Some(&last) = self.indices.last() {
            if last >= dim {
                return Err(format!("index {} out of range for {} terms", last, dim));
            }
        }
        Ok(())
    }
}

/// Serialized vectorizer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfParams {
    /// Term to column index
    pub vocabulary: HashMap<String, usize>,
    /// Inverse document frequency per column
    pub idf: Vec<f64>,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub norm: Norm,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
}

impl TfidfParams {
    /// Parameters with default options
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> Self {
        Self {
            vocabulary,
            idf,
            lowercase: true,
            ngram_range: default_ngram_range(),
            stop_words: Vec::new(),
            sublinear_tf: false,
            norm: Norm::default(),
            token_pattern: default_token_pattern(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

/// Maps text onto the weighted term space of a fitted vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TfidfParams", into = "TfidfParams")]
pub struct TfidfVectorizer {
    params: TfidfParams,
    token_re: Regex,
    stop_words: HashSet<String>,
}

impl TryFrom<TfidfParams> for TfidfVectorizer {
    type Error = String;

    fn try_from(params: TfidfParams) -> Result<Self, String> {
        let dim = params.idf.len();
        if params.vocabulary.len() != dim {
            return Err(format!(
                "vocabulary has {} terms but idf has {} weights",
                params.vocabulary.len(),
                dim
            ));
        }
        if let Some((term, idx)) = params.vocabulary.iter().find(|(_, &idx)| idx >= dim) {
            return Err(format!("term '{}' maps to column {} of {}", term, idx, dim));
        }
        let (min_n, max_n) = params.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid ngram_range ({}, {})", min_n, max_n));
        }

        let token_re = Regex::new(&params.token_pattern)
            .map_err(|e| format!("invalid token_pattern: {}", e))?;
        let stop_words = params.stop_words.iter().cloned().collect();

        Ok(Self {
            params,
            token_re,
            stop_words,
        })
    }
}

impl From<TfidfVectorizer> for TfidfParams {
    fn from(v: TfidfVectorizer) -> Self {
        v.params
    }
}

impl TfidfVectorizer {
    pub fn new(params: TfidfParams) -> Result<Self, String> {
        Self::try_from(params)
    }

    pub fn params(&self) -> &TfidfParams {
        &self.params
    }

    /// Number of columns in the output space
    pub fn dim(&self) -> usize {
        self.params.idf.len()
    }

    /// Tokens after lowercasing and stop-word removal
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.params.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        self.token_re
            .captures_iter(&text)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str().to_string())
            .filter(|t| !self.stop_words.contains(t))
            .collect()
    }

    fn ngrams(&self, tokens: &[String]) -> Vec<String> {
        let (min_n, max_n) = self.params.ngram_range;
        let mut out = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            out.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        out
    }

    /// Weighted, normalised term vector for `text`. Terms outside the
    /// vocabulary are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in self.ngrams(&self.tokenize(text)) {
            if let Some(&idx) = self.params.vocabulary.get(&gram) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector = SparseVector {
            indices: Vec::with_capacity(counts.len()),
            values: Vec::with_capacity(counts.len()),
        };
        for (idx, tf) in counts {
            let tf = if self.params.sublinear_tf { 1.0 + tf.ln() } else { tf };
            vector.indices.push(idx);
            vector.values.push(tf * self.params.idf[idx]);
        }

        if self.params.norm == Norm::L2 {
            let norm = vector.norm();
            if norm > 0.0 {
                vector.values.iter_mut().for_each(|v| *v /= norm);
            }
        }
        vector
    }
}
