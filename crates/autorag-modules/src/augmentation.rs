use std::str::FromStr;

use anyhow::Result;
use autorag_core::error::Error;
use autorag_core::traits::Augmenter;
use autorag_core::types::{dedupe_by_stable_key, Chunk};

/// `pass`: chunks go through untouched.
pub struct NoAugment;

impl Augmenter for NoAugment {
    fn name(&self) -> &str { "pass" }

    fn augment(&self, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> { Ok(chunks) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeighborMode {
    Prev,
    Next,
    #[default]
    Both,
}

impl FromStr for NeighborMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prev" => Ok(NeighborMode::Prev),
            "next" => Ok(NeighborMode::Next),
            "both" => Ok(NeighborMode::Both),
            other => Err(Error::InvalidConfig(format!("unknown neighbour mode '{}' (expected prev, next or both)", other))),
        }
    }
}

/// `prev_next`: each retrieved chunk is followed by its neighbours in the
/// retrieved list. Duplicates collapse onto their first occurrence.
pub struct PrevNextAugment {
    mode: NeighborMode,
}

impl PrevNextAugment {
    pub fn new(mode: NeighborMode) -> Self { Self { mode } }
}

impl Default for PrevNextAugment {
    fn default() -> Self { Self::new(NeighborMode::Both) }
}

impl Augmenter for PrevNextAugment {
    fn name(&self) -> &str { "prev_next" }

    fn augment(&self, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let with_prev = matches!(self.mode, NeighborMode::Prev | NeighborMode::Both);
        let with_next = matches!(self.mode, NeighborMode::Next | NeighborMode::Both);
        let mut out = Vec::with_capacity(chunks.len() * 3);
        for (i, chunk) in chunks.iter().enumerate() {
            out.push(chunk.clone());
            if with_prev && i > 0 {
                out.push(chunks[i - 1].clone());
            }
            if with_next && i + 1 < chunks.len() {
                out.push(chunks[i + 1].clone());
            }
        }
        Ok(dedupe_by_stable_key(out))
    }
}
