//! Text-similarity search over a fixed catalog

pub mod tfidf;

use crate::artifact::{read_json, Artifact, ArtifactMeta};
use modelgate_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use tfidf::{Norm, SparseVector, TfidfParams, TfidfVectorizer, DEFAULT_TOKEN_PATTERN};

/// Metadata for one title in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub show_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub country: Option<String>,
    pub release_year: i32,
    pub rating: Option<String>,
    pub duration: Option<String>,
    pub listed_in: String,
}

/// A catalog record with its precomputed text vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub record: CatalogRecord,
    pub vector: SparseVector,
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub record: CatalogRecord,
    pub score: f64,
}

/// Vectorizer plus the read-only corpus it indexed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIndex {
    #[serde(default)]
    pub version: Option<String>,
    pub vectorizer: TfidfVectorizer,
    pub rows: Vec<IndexedRecord>,
}

impl SearchIndex {
    /// Index `(record, text)` pairs with an already fitted vectorizer
    pub fn from_documents<I>(vectorizer: TfidfVectorizer, documents: I) -> Self
    where
        I: IntoIterator<Item = (CatalogRecord, String)>,
    {
        let rows = documents
            .into_iter()
            .map(|(record, text)| IndexedRecord {
                vector: vectorizer.transform(&text),
                record,
            })
            .collect();

        Self {
            version: None,
            vectorizer,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let dim = self.vectorizer.dim();
        for (i, row) in self.rows.iter().enumerate() {
            row.vector
                .validate(dim)
                .map_err(|e| format!("row {} ({}): {}", i, row.record.show_id, e))?;
        }
        Ok(())
    }

    /// Rank the corpus against `query`.
    ///
    /// Scores are non-increasing; equal scores keep corpus order. When
    /// `type_filter` is set only records whose type matches it
    /// case-insensitively are returned.
    pub fn search(&self, query: &str, type_filter: Option<&str>, top_k: usize) -> Vec<SearchHit> {
        let q = self.vectorizer.transform(&query.to_lowercase());

        let mut scored: Vec<(usize, f64)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i, q.cosine(&row.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .filter(|(i, _)| match type_filter {
                Some(kind) => self.rows[*i].record.kind.eq_ignore_ascii_case(kind),
                None => true,
            })
            .take(top_k)
            .map(|(i, score)| SearchHit {
                record: self.rows[i].record.clone(),
                score,
            })
            .collect()
    }
}

impl Artifact for SearchIndex {
    type Source = PathBuf;

    fn load(source: &PathBuf) -> Result<Self> {
        let index: SearchIndex = read_json(source)?;
        index.validate().map_err(|reason| Error::corrupt(source, reason))?;
        Ok(index)
    }

    fn primary_path(source: &PathBuf) -> &Path {
        source
    }

    fn meta(&self) -> ArtifactMeta {
        let mut metrics = BTreeMap::new();
        metrics.insert("rows".to_string(), self.rows.len() as f64);
        metrics.insert("vocabulary".to_string(), self.vectorizer.dim() as f64);
        ArtifactMeta {
            version: self.version.clone(),
            metrics,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(id: &str, kind: &str, title: &str) -> CatalogRecord {
        CatalogRecord {
            show_id: id.to_string(),
            kind: kind.to_string(),
            title: title.to_string(),
            country: Some("United States".to_string()),
            release_year: 2020,
            rating: Some("TV-MA".to_string()),
            duration: None,
            listed_in: "Dramas".to_string(),
        }
    }

    fn index() -> SearchIndex {
        let terms = ["crime", "drama", "heist", "space", "comedy"];
        let vocabulary: HashMap<String, usize> =
            terms.iter().enumerate().map(|(i, t)| (t.to_string(), i)).collect();
        let vectorizer = TfidfVectorizer::new(TfidfParams::new(vocabulary, vec![1.0; 5])).unwrap();

        SearchIndex::from_documents(
            vectorizer,
            vec![
                (record("s1", "Movie", "Heist"), "crime heist".to_string()),
                (record("s2", "TV Show", "Heist Files"), "crime heist".to_string()),
                (record("s3", "Movie", "Star Road"), "space drama".to_string()),
                (record("s4", "Movie", "Laughs"), "comedy".to_string()),
            ],
        )
    }

    #[test]
    fn test_exact_text_scores_one() {
        let hits = index().search("space drama", None, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.show_id, "s3");
        assert!((hits[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let hits = index().search("Crime Heist", None, 3);
        let ids: Vec<_> = hits.iter().map(|h| h.record.show_id.as_str()).collect();
        assert_eq!(ids[..2], ["s1", "s2"]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_type_filter_is_case_insensitive() {
        let hits = index().search("crime heist", Some("tv show"), 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.kind, "TV Show");
    }

    #[test]
    fn test_top_k_bounds_results() {
        let idx = index();
        assert_eq!(idx.search("crime", None, 2).len(), 2);
        assert_eq!(idx.search("crime", None, 100).len(), idx.len());
    }

    #[test]
    fn test_hit_serializes_flat() {
        let hit = &index().search("comedy", None, 1)[0];
        let json = serde_json::to_value(hit).unwrap();
        assert_eq!(json["type"], "Movie");
        assert_eq!(json["show_id"], "s4");
        assert!(json["duration"].is_null());
        assert!(json.get("record").is_none());
    }

    #[test]
    fn test_load_rejects_bad_rows() {
        let mut idx = index();
        idx.rows[0].vector.indices = vec![9];
        idx.rows[0].vector.values = vec![1.0];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommender.json");
        std::fs::write(&path, serde_json::to_vec(&idx).unwrap()).unwrap();

        assert!(matches!(SearchIndex::load(&path), Err(Error::ArtifactCorrupt { .. })));
    }
}
