use std::sync::Arc;

use autorag_core::traits::{Retriever, SparseSearch};
use autorag_core::types::Chunk;

use crate::Bm25Index;

/// Sparse-only retrieval candidate.
pub struct Bm25Retriever {
    index: Arc<Bm25Index>,
}

impl Bm25Retriever {
    pub fn new(index: Arc<Bm25Index>) -> Self { Self { index } }
}

impl Retriever for Bm25Retriever {
    fn name(&self) -> &str { "bm25" }

    fn retrieve(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<Chunk>> {
        self.index.search(query, top_k)
    }
}
