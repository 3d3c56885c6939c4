use std::sync::Arc;

use anyhow::Result;
use autorag_core::traits::Generator;
use autorag_core::types::Chunk;

use crate::llm::ChatModel;

/// `llm`: one chat completion of the prompt. Contexts pass through so the
/// evaluator sees what the answer was grounded on.
pub struct LlmGenerator {
    llm: Arc<dyn ChatModel>,
}

impl LlmGenerator {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self { Self { llm } }
}

impl Generator for LlmGenerator {
    fn name(&self) -> &str { "llm" }

    fn generate(&self, prompt: &str, chunks: Vec<Chunk>) -> Result<(String, Vec<Chunk>)> {
        let answer = self.llm.ask(prompt)?;
        Ok((answer.trim().to_string(), chunks))
    }
}
