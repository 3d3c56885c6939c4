use std::sync::Arc;

use anyhow::Result;
use autorag_core::traits::Reranker;
use autorag_core::types::Chunk;

use crate::llm::ChatModel;

const MAX_PASSAGE_CHARS: usize = 4000;

/// `pass`: keep retrieval order, cut to `top_k`.
pub struct PassReranker;

impl Reranker for PassReranker {
    fn name(&self) -> &str { "pass" }

    fn rerank(&self, _question: &str, mut chunks: Vec<Chunk>, top_k: usize) -> Result<Vec<Chunk>> {
        chunks.truncate(top_k);
        Ok(chunks)
    }
}

/// `flag_llm`: the chat model grades each passage 0-10 for the question.
pub struct FlagLlmReranker {
    llm: Arc<dyn ChatModel>,
}

impl FlagLlmReranker {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self { Self { llm } }

    fn score(&self, question: &str, passage: &str) -> Result<f64> {
        let clipped: String = passage.chars().take(MAX_PASSAGE_CHARS).collect();
        let prompt = format!(
            "Score (0-10) how well this passage answers the query.\nQuery: {}\nPassage: {}\nScore:",
            question, clipped
        );
        let reply = self.llm.ask(&prompt)?;
        Ok(parse_score(&reply))
    }
}

/// Reads the grade from a model reply; anything unparsable is `0.0`.
pub(crate) fn parse_score(reply: &str) -> f64 {
    match reply.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

impl Reranker for FlagLlmReranker {
    fn name(&self) -> &str { "flag_llm" }

    fn rerank(&self, question: &str, chunks: Vec<Chunk>, top_k: usize) -> Result<Vec<Chunk>> {
        let mut scored = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let s = self.score(question, &chunk.text)?;
            scored.push((s, chunk));
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        tracing::debug!(scores = ?scored.iter().map(|(s, _)| *s).collect::<Vec<_>>(), "llm rerank");
        Ok(scored.into_iter().take(top_k).map(|(_, c)| c).collect())
    }
}
