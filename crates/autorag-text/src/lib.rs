//! autorag-text
//!
//! Tantivy BM25 index over the full chunk corpus, built once and shared
//! read-only, plus the `bm25` retrieval candidate that queries it.

pub mod tantivy_utils;
pub mod index;
pub mod retriever;

pub use index::Bm25Index;
pub use retriever::Bm25Retriever;
