use std::sync::Arc;

use autorag_core::error::Error;
use autorag_core::traits::{DenseSearch, Retriever, SparseSearch};
use autorag_core::types::Chunk;

use crate::fusion::{fuse_dbsf, DEFAULT_ALPHA, DEFAULT_DENSE_CANDIDATES};

/// `hybrid_dbsf` retrieval candidate.
///
/// The sparse engine is queried for `top_k`, the dense engine for
/// `dense_candidates` (oversampled so fusion has material to work with).
/// The sparse index is shared, typically with the `bm25` candidate.
pub struct HybridDbsfRetriever<S: ?Sized, D: ?Sized>
where
    S: SparseSearch,
    D: DenseSearch,
{
    sparse: Arc<S>,
    dense: Arc<D>,
    alpha: f64,
    dense_candidates: usize,
}

impl<S: ?Sized, D: ?Sized> HybridDbsfRetriever<S, D>
where
    S: SparseSearch,
    D: DenseSearch,
{
    pub fn new(sparse: Arc<S>, dense: Arc<D>, alpha: f64, dense_candidates: usize) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(Error::InvalidConfig(format!("fusion alpha must be within [0, 1], got {}", alpha)));
        }
        if dense_candidates == 0 {
            return Err(Error::InvalidConfig("dense candidate count must be positive".to_string()));
        }
        Ok(Self { sparse, dense, alpha, dense_candidates })
    }

    pub fn with_defaults(sparse: Arc<S>, dense: Arc<D>) -> Self {
        Self { sparse, dense, alpha: DEFAULT_ALPHA, dense_candidates: DEFAULT_DENSE_CANDIDATES }
    }

    pub fn alpha(&self) -> f64 { self.alpha }
}

impl<S: ?Sized, D: ?Sized> Retriever for HybridDbsfRetriever<S, D>
where
    S: SparseSearch,
    D: DenseSearch,
{
    fn name(&self) -> &str { "hybrid_dbsf" }

    fn retrieve(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<Chunk>> {
        let sparse = self.sparse.search(query, top_k)?;
        let dense = self.dense.similarity_search(query, self.dense_candidates)?;
        tracing::debug!(sparse = sparse.len(), dense = dense.len(), alpha = self.alpha, "fusing rankings");
        Ok(fuse_dbsf(sparse, dense, self.alpha, top_k).into_iter().map(|f| f.chunk).collect())
    }
}
