use std::sync::Arc;

use anyhow::Result;
use autorag_core::traits::QueryExpander;

use crate::llm::ChatModel;

/// `pass`: the question is the query.
pub struct PassExpander;

impl QueryExpander for PassExpander {
    fn name(&self) -> &str { "pass" }

    fn expand(&self, question: &str) -> Result<String> { Ok(question.to_string()) }
}

/// `hyde`: retrieve with a hypothetical answer instead of the question.
pub struct HydeExpander {
    llm: Arc<dyn ChatModel>,
}

impl HydeExpander {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self { Self { llm } }
}

impl QueryExpander for HydeExpander {
    fn name(&self) -> &str { "hyde" }

    fn expand(&self, question: &str) -> Result<String> {
        let answer = self.llm.ask(&format!("Write a concise answer to: {}", question))?;
        tracing::debug!(question, expanded = %answer, "hyde expansion");
        Ok(answer.trim().to_string())
    }
}
