//! Catalog search by TF-IDF similarity

use super::{run_blocking, Gateway, Violations};
use crate::artifact::ArtifactStore;
use crate::registry::Domain;
use crate::search::{SearchHit, SearchIndex};
use async_trait::async_trait;
use modelgate_core::{FieldError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    /// Type to keep, compared ignoring case ("Movie", "TV Show"); empty means any
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    pub top_k: i64,
}

impl SearchRequest {
    pub fn validate(&self, max_top_k: usize) -> Result<()> {
        let mut violations = Violations::default();
        if self.query.trim().is_empty() {
            violations.push(FieldError::new("query", "invalid", "Query must not be empty"));
        }
        violations
            .between("top_k", self.top_k, 1, i64::try_from(max_top_k).unwrap_or(i64::MAX))
            .finish()
    }

    /// Type filter, if one was given. Only the empty string means "any";
    /// whitespace is part of the value.
    pub fn type_filter(&self) -> Option<&str> {
        self.kind.as_deref().filter(|k| !k.is_empty())
    }
}

pub struct RecommendGateway {
    store: Arc<ArtifactStore<SearchIndex>>,
    max_top_k: usize,
}

impl RecommendGateway {
    pub fn new(store: Arc<ArtifactStore<SearchIndex>>, max_top_k: usize) -> Self {
        Self { store, max_top_k }
    }

    pub fn store(&self) -> &Arc<ArtifactStore<SearchIndex>> {
        &self.store
    }

    pub fn max_top_k(&self) -> usize {
        self.max_top_k
    }

    pub fn infer(index: &SearchIndex, request: &SearchRequest) -> Vec<SearchHit> {
        // Validated to be at least 1
        let top_k = usize::try_from(request.top_k).unwrap_or(0);
        let hits = index.search(&request.query, request.type_filter(), top_k);
        debug!(
            query = %request.query,
            type_filter = request.type_filter().unwrap_or("*"),
            hits = hits.len(),
            "Catalog search"
        );
        hits
    }
}

#[async_trait]
impl Gateway for RecommendGateway {
    type Request = SearchRequest;
    type Response = Vec<SearchHit>;

    async fn predict(&self, request: SearchRequest) -> Result<Vec<SearchHit>> {
        request.validate(self.max_top_k)?;
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            let index = store.get()?;
            Ok(Self::infer(&index, &request))
        })
        .await
    }

    fn domain(&self) -> Domain {
        Domain::Recommend
    }
}
