//! Semantic search over the vector collection.
//!
//! Turns free text into a query vector, runs a K-NN lookup, and joins the
//! hits back to catalog descriptions. Search never raises past this
//! boundary: an unconfigured provider, a provider failure, or a store
//! failure all degrade to an empty result (logged), which callers treat as
//! "no results" rather than a crash.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::catalog::Catalog;
use crate::error::FooddexError;
use crate::provider::Embedder;
use crate::store::VectorStore;

/// One search result.
///
/// `similarity` is derived from the store's L2 distance as
/// `1 - distance/2`, a mapping that is cosine-equivalent only because the
/// provider's vectors are unit-normalized. If the provider ever stops
/// normalizing, this score becomes silently wrong — the formula is a
/// documented assumption, not a general-purpose conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub fdc_id: i64,
    pub description: String,
    pub similarity: f64,
}

/// Text-to-K-NN search over one database.
///
/// Connections are opened per call; concurrent searches therefore never
/// contend on a shared handle.
pub struct SearchService<E> {
    embedder: Arc<E>,
    db_path: PathBuf,
}

impl<E: Embedder> SearchService<E> {
    pub fn new(embedder: Arc<E>, db_path: impl AsRef<Path>) -> Self {
        Self {
            embedder,
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Return up to `k` catalog records nearest to `query`, best first.
    ///
    /// Hits whose id no longer exists in the catalog are dropped, so the
    /// result can be shorter than `k` even when the index holds enough
    /// vectors. `k` must be at least 1; anything else yields no results.
    pub async fn search_by_text(&self, query: &str, k: usize) -> Vec<SearchHit> {
        if k == 0 {
            warn!("search called with k = 0");
            return Vec::new();
        }
        if !self.embedder.is_configured() {
            warn!("embedding provider not configured; returning no results");
            return Vec::new();
        }

        match self.try_search(query, k).await {
            Ok(hits) => hits,
            Err(err) => {
                error!(error = %err, query, "search failed; returning no results");
                Vec::new()
            }
        }
    }

    async fn try_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, FooddexError> {
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| FooddexError::Provider("provider returned no query vector".into()))?;

        let store = VectorStore::open(&self.db_path)?;
        let neighbors = store.query_nearest(&query_vector, k)?;
        debug!(hits = neighbors.len(), k, "nearest-neighbor lookup complete");
        if neighbors.is_empty() {
            return Ok(Vec::new());
        }

        let catalog = Catalog::open(&self.db_path)?;
        let ids: Vec<i64> = neighbors.iter().map(|(id, _)| *id).collect();
        let records = catalog.get_by_ids(&ids)?;

        // Preserve distance order from the index; ids the catalog no longer
        // knows about are silently dropped.
        let mut hits = Vec::with_capacity(neighbors.len());
        for (id, distance) in neighbors {
            if let Some(record) = records.iter().find(|r| r.fdc_id == id) {
                hits.push(SearchHit {
                    fdc_id: id,
                    description: record.description.clone(),
                    similarity: 1.0 - distance / 2.0,
                });
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StubEmbedder;
    use async_trait::async_trait;

    struct UnconfiguredEmbedder;

    #[async_trait]
    impl Embedder for UnconfiguredEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, FooddexError> {
            Err(FooddexError::ProviderUnconfigured("no key".into()))
        }

        fn is_configured(&self) -> bool {
            false
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model(&self) -> &str {
            "unconfigured"
        }
    }

    #[tokio::test]
    async fn unconfigured_provider_yields_no_results() {
        let service = SearchService::new(
            Arc::new(UnconfiguredEmbedder),
            "/nonexistent/fooddex.sqlite",
        );
        assert!(service.search_by_text("apple", 5).await.is_empty());
    }

    #[tokio::test]
    async fn zero_k_yields_no_results() {
        let service = SearchService::new(
            Arc::new(StubEmbedder::new(4)),
            "/nonexistent/fooddex.sqlite",
        );
        assert!(service.search_by_text("apple", 0).await.is_empty());
    }

    #[tokio::test]
    async fn store_failure_degrades_to_empty() {
        // Configured provider, but the db path does not exist as a usable
        // store: the error is logged and swallowed, never raised.
        let service = SearchService::new(
            Arc::new(StubEmbedder::new(4)),
            "/nonexistent/dir/fooddex.sqlite",
        );
        assert!(service.search_by_text("apple", 3).await.is_empty());
    }

    #[test]
    fn similarity_mapping_from_l2_distance() {
        // Identical unit vectors: distance 0 → similarity 1. Orthogonal
        // unit vectors: distance sqrt(2) → similarity 1 - sqrt(2)/2 ≈ 0.29.
        let identical = SearchHit {
            fdc_id: 1,
            description: "same".into(),
            similarity: 1.0 - 0.0 / 2.0,
        };
        assert!((identical.similarity - 1.0).abs() < f64::EPSILON);

        let orthogonal = 1.0 - std::f64::consts::SQRT_2 / 2.0;
        assert!(orthogonal > 0.29 && orthogonal < 0.30);
    }
}
