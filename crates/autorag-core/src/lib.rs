//! autorag-core
//!
//! Shared model for the greedy RAG pipeline search: chunks, ground truth,
//! score records, the six stage capability traits, and the configuration
//! loader used by every other crate in the workspace.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod ground_truth;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{Chunk, ChunkMeta, ScoreRecord, Stage};
