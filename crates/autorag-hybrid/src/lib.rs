//! autorag-hybrid
//!
//! Distribution-Based Score Fusion over a sparse and a dense ranking. Only
//! ranks are used, so the two engines' score scales never need to agree.

pub mod fusion;
pub mod retriever;

pub use fusion::{fuse_dbsf, FusedChunk, DEFAULT_ALPHA, DEFAULT_DENSE_CANDIDATES};
pub use retriever::HybridDbsfRetriever;
