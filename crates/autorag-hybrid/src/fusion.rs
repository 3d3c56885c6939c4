use std::collections::HashMap;

use autorag_core::types::Chunk;

pub const DEFAULT_ALPHA: f64 = 0.7;
pub const DEFAULT_DENSE_CANDIDATES: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct FusedChunk {
    pub chunk: Chunk,
    pub score: f64,
}

/// Merge two rankings by weighted reciprocal rank.
///
/// A chunk at 1-based rank `r` contributes `alpha / r` from `sparse` and
/// `(1 - alpha) / r` from `dense`. Chunks are identified by
/// [`Chunk::content_key`]; the first sighting (sparse list first) is kept as
/// the representative, and a chunk repeated inside one list is only counted
/// at its best rank. The result is sorted by fused score, descending, with
/// ties left in first-seen order, and cut to `k`.
pub fn fuse_dbsf(sparse: Vec<Chunk>, dense: Vec<Chunk>, alpha: f64, k: usize) -> Vec<FusedChunk> {
    let mut fused: Vec<FusedChunk> = Vec::with_capacity(sparse.len() + dense.len());
    let mut slot: HashMap<String, usize> = HashMap::new();

    for (list, weight) in [(sparse, alpha), (dense, 1.0 - alpha)] {
        let mut counted = vec![false; fused.len() + list.len()];
        for (i, chunk) in list.into_iter().enumerate() {
            let contribution = weight / (i + 1) as f64;
            let existing = slot.get(chunk.content_key()).copied();
            match existing {
                Some(j) => {
                    if !counted[j] {
                        fused[j].score += contribution;
                        counted[j] = true;
                    }
                }
                None => {
                    let j = fused.len();
                    slot.insert(chunk.content_key().to_string(), j);
                    fused.push(FusedChunk { chunk, score: contribution });
                    counted[j] = true;
                }
            }
        }
    }

    // `sort_by` is stable, which is what keeps ties in sparse-then-dense order.
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(k);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(id: &str) -> Chunk { Chunk::new(format!("text of {}", id), "src").with_id(id) }

    #[test]
    fn repeated_chunk_in_one_list_counts_once() {
        let fused = fuse_dbsf(vec![c("A"), c("A"), c("B")], vec![], 1.0, 10);
        assert_eq!(fused.len(), 2);
        assert!((fused[0].score - 1.0).abs() < 1e-12);
        assert!((fused[1].score - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn chunks_without_ids_fuse_on_full_text() {
        let sparse = vec![Chunk::new("same words", "a")];
        let dense = vec![Chunk::new("same words", "b")];
        let fused = fuse_dbsf(sparse, dense, 0.5, 10);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].chunk.metadata.source_id, "a", "sparse copy is the representative");
        assert!((fused[0].score - 1.0).abs() < 1e-12);
    }
}
