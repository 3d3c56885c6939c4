use std::collections::BTreeMap;

use crate::types::{Chunk, ScoreRecord};

/// Metric name to value, as reported by an evaluator. Values stay as JSON so a
/// missing or non-numeric metric can be told apart from a real zero.
pub type MetricMap = BTreeMap<String, serde_json::Value>;

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Full-corpus lexical search.
pub trait SparseSearch: Send + Sync {
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Chunk>>;
}

/// Vector-store similarity search.
pub trait DenseSearch: Send + Sync {
    fn similarity_search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Chunk>>;
}

// Stage capabilities. Each stage kind is its own trait; `name` is the label
// used in logs and reports.

pub trait QueryExpander: Send + Sync {
    fn name(&self) -> &str;
    fn expand(&self, question: &str) -> anyhow::Result<String>;
}

pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;
    /// Ordered chunks, at most `top_k` of them.
    fn retrieve(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<Chunk>>;
}

pub trait Augmenter: Send + Sync {
    fn name(&self) -> &str;
    fn augment(&self, chunks: Vec<Chunk>) -> anyhow::Result<Vec<Chunk>>;
}

pub trait Reranker: Send + Sync {
    fn name(&self) -> &str;
    /// Ordered chunks, at most `top_k` of them.
    fn rerank(&self, question: &str, chunks: Vec<Chunk>, top_k: usize) -> anyhow::Result<Vec<Chunk>>;
}

pub trait PromptMaker: Send + Sync {
    fn name(&self) -> &str;
    fn make_prompt(&self, question: &str, chunks: &[Chunk]) -> anyhow::Result<String>;
}

pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    /// Returns the answer and the contexts it was produced from.
    fn generate(&self, prompt: &str, chunks: Vec<Chunk>) -> anyhow::Result<(String, Vec<Chunk>)>;
}

/// Quality scoring over a batch of predictions. Must tolerate an empty batch.
pub trait Evaluator: Send + Sync {
    fn score(&self, records: &[ScoreRecord]) -> anyhow::Result<MetricMap>;
}
