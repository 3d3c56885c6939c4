//! Domain types shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub type ChunkId = String;

/// Characters of `text` used as identity when a chunk carries no explicit id.
pub const STABLE_KEY_PREFIX_CHARS: usize = 100;

/// Where a chunk came from.
///
/// - `source_id`: the source document, as a corpus-relative path or an external id
/// - `page`: page number within the source, when the source is paginated
/// - `chunk_id`: explicit chunk identity assigned at ingestion, if any
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub source_id: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub chunk_id: Option<ChunkId>,
}

/// A unit of retrieved text plus its metadata.
///
/// Chunks are value objects: stages receive them, may reorder or drop them,
/// but never edit one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMeta,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self { text: text.into(), metadata: ChunkMeta { source_id: source_id.into(), ..ChunkMeta::default() } }
    }

    pub fn with_id(mut self, id: impl Into<ChunkId>) -> Self {
        self.metadata.chunk_id = Some(id.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.metadata.page = Some(page);
        self
    }

    /// Deduplication identity: the explicit id, else a prefix of the text.
    pub fn stable_key(&self) -> String {
        match &self.metadata.chunk_id {
            Some(id) => id.clone(),
            None => self.text.chars().take(STABLE_KEY_PREFIX_CHARS).collect(),
        }
    }

    /// Fusion identity: the explicit id, else the full text.
    pub fn content_key(&self) -> &str {
        self.metadata.chunk_id.as_deref().unwrap_or(&self.text)
    }
}

/// Drop repeated chunks (by `stable_key`), keeping the first occurrence.
pub fn dedupe_by_stable_key(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut seen = HashSet::new();
    chunks.into_iter().filter(|c| seen.insert(c.stable_key())).collect()
}

/// The six fixed steps of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    QueryExpansion,
    Retrieval,
    Augmentation,
    Reranker,
    PromptMaker,
    Generator,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::QueryExpansion,
        Stage::Retrieval,
        Stage::Augmentation,
        Stage::Reranker,
        Stage::PromptMaker,
        Stage::Generator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::QueryExpansion => "query_expansion",
            Stage::Retrieval => "retrieval",
            Stage::Augmentation => "augmentation",
            Stage::Reranker => "reranker",
            Stage::PromptMaker => "prompt_maker",
            Stage::Generator => "generator",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Stage {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| crate::error::Error::NotFound(format!("stage '{}'", s)))
    }
}

/// One prediction in the shape the evaluator consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub question: String,
    pub predicted_answer: String,
    pub reference_answers: Vec<String>,
    pub retrieved_contexts: Vec<String>,
}
