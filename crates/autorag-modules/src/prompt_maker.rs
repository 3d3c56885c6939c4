use std::sync::Arc;

use anyhow::Result;
use autorag_core::traits::PromptMaker;
use autorag_core::types::Chunk;

use crate::llm::{ChatMessage, ChatModel};

fn join_texts<'a>(chunks: impl IntoIterator<Item = &'a Chunk>, sep: &str) -> String {
    chunks.into_iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(sep)
}

/// `f_string`: context passages in order, then the question.
pub struct FStringPrompt;

impl PromptMaker for FStringPrompt {
    fn name(&self) -> &str { "f_string" }

    fn make_prompt(&self, question: &str, chunks: &[Chunk]) -> Result<String> {
        let context = join_texts(chunks, "\n\n");
        Ok(format!(
            "You are a helpful assistant.\nAnswer the user strictly using the context below.\n---\n{}\n---\nQuestion: {}\nAnswer:",
            context, question
        ))
    }
}

/// `long_context_reorder`: the best passage opens and closes the context so
/// it never sits in the middle of a long prompt.
pub struct LongContextPrompt;

impl PromptMaker for LongContextPrompt {
    fn name(&self) -> &str { "long_context_reorder" }

    fn make_prompt(&self, question: &str, chunks: &[Chunk]) -> Result<String> {
        let Some((best, rest)) = chunks.split_first() else {
            return FStringPrompt.make_prompt(question, chunks);
        };
        let remaining = join_texts(rest, "\n\n");
        let context = format!("{}\n\n{}\n\n{}", best.text, remaining, best.text);
        Ok(format!(
            "You are a helpful assistant.\nUse the following context to answer. If the answer isn't there, say you don't know.\n---\n{}\n---\nQuestion: {}\nAnswer:",
            context, question
        ))
    }
}

/// `dynamic_llm`: the chat model writes the prompt.
pub struct DynamicPrompt {
    llm: Arc<dyn ChatModel>,
}

impl DynamicPrompt {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self { Self { llm } }
}

impl PromptMaker for DynamicPrompt {
    fn name(&self) -> &str { "dynamic_llm" }

    fn make_prompt(&self, question: &str, chunks: &[Chunk]) -> Result<String> {
        let context = join_texts(chunks, "\n\n---\n\n");
        let messages = [
            ChatMessage::system(
                "You are an expert prompt engineer. Given the following context and a user question, \
                 craft a single string that includes both a system instruction and a user instruction, \
                 designed to get the best possible answer from a helpful assistant.",
            ),
            ChatMessage::user(format!(
                "CONTEXT:\n{}\n\nQUESTION: {}\n\nNow produce:\n  1. A brief system message (tone, persona, rules) and\n  \
                 2. A user message that includes the question and refers to the context.\n\
                 Put them together as one prompt.",
                context, question
            )),
        ];
        self.llm.complete(&messages)
    }
}
