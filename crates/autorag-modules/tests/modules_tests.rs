use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use autorag_core::config::LlmSettings;
use autorag_core::traits::{Augmenter, Generator, PromptMaker, QueryExpander, Reranker};
use autorag_core::types::Chunk;
use autorag_modules::{
    ChatClient, ChatMessage, ChatModel, DynamicPrompt, FStringPrompt, FlagLlmReranker, HydeExpander, LlmGenerator,
    LongContextPrompt, NeighborMode, NoAugment, PassExpander, PassReranker, PrevNextAugment, Role,
};

/// Replies by looking for a trigger substring in the last message; records
/// every conversation it receives.
struct ScriptedChat {
    rules: Vec<(&'static str, &'static str)>,
    fallback: &'static str,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    fn new(rules: Vec<(&'static str, &'static str)>, fallback: &'static str) -> Arc<Self> {
        Arc::new(Self { rules, fallback, seen: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> Vec<Vec<ChatMessage>> { self.seen.lock().unwrap().clone() }
}

impl ChatModel for ScriptedChat {
    fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        let reply = self.rules.iter().find(|(needle, _)| last.contains(needle)).map(|(_, r)| *r).unwrap_or(self.fallback);
        Ok(reply.to_string())
    }
}

struct FailingChat;

impl ChatModel for FailingChat {
    fn complete(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> { anyhow::bail!("endpoint unreachable") }
}

fn c(id: &str, text: &str) -> Chunk { Chunk::new(text, "doc").with_id(id) }

fn ids(chunks: &[Chunk]) -> Vec<String> {
    chunks.iter().map(|c| c.metadata.chunk_id.clone().unwrap_or_default()).collect()
}

#[test]
fn pass_expander_is_identity() {
    assert_eq!(PassExpander.name(), "pass");
    assert_eq!(PassExpander.expand("How do I purify water?").unwrap(), "How do I purify water?");
}

#[test]
fn hyde_asks_for_a_concise_answer() {
    let chat = ScriptedChat::new(vec![], "  Boil it for one minute.  ");
    let hyde = HydeExpander::new(chat.clone());
    assert_eq!(hyde.name(), "hyde");
    assert_eq!(hyde.expand("How do I purify water?").unwrap(), "Boil it for one minute.");

    let calls = chat.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0].role, Role::User);
    assert_eq!(calls[0][0].content, "Write a concise answer to: How do I purify water?");
}

#[test]
fn hyde_propagates_model_failure() {
    let hyde = HydeExpander::new(Arc::new(FailingChat));
    assert!(hyde.expand("anything").is_err());
}

#[test]
fn no_augment_passes_through() {
    let chunks = vec![c("a", "one"), c("b", "two")];
    assert_eq!(NoAugment.augment(chunks.clone()).unwrap(), chunks);
}

#[test]
fn prev_next_both_keeps_order_without_duplicates() {
    let chunks = vec![c("a", "one"), c("b", "two"), c("c", "three")];
    let aug = PrevNextAugment::new(NeighborMode::Both);
    assert_eq!(aug.name(), "prev_next");

    let out = aug.augment(chunks.clone()).unwrap();
    assert_eq!(ids(&out), vec!["a", "b", "c"]);
    let unique: HashSet<String> = out.iter().map(|c| c.stable_key()).collect();
    assert_eq!(unique.len(), out.len());
    assert_eq!(aug.augment(out.clone()).unwrap(), out);
}

#[test]
fn prev_next_directional_modes() {
    let chunks = vec![c("a", "one"), c("b", "two"), c("b", "two again"), c("c", "three")];
    let prev = PrevNextAugment::new(NeighborMode::Prev).augment(chunks.clone()).unwrap();
    assert_eq!(ids(&prev), vec!["a", "b", "c"]);
    let next = PrevNextAugment::new(NeighborMode::Next).augment(chunks).unwrap();
    assert_eq!(ids(&next), vec!["a", "b", "c"]);
    assert!(PrevNextAugment::default().augment(vec![]).unwrap().is_empty());
}

#[test]
fn pass_reranker_truncates() {
    let chunks = vec![c("a", "1"), c("b", "2"), c("c", "3")];
    assert_eq!(ids(&PassReranker.rerank("q", chunks.clone(), 2).unwrap()), vec!["a", "b"]);
    assert_eq!(PassReranker.rerank("q", chunks, 10).unwrap().len(), 3);
}

#[test]
fn flag_llm_sorts_by_score_and_treats_garbage_as_zero() {
    let chat = ScriptedChat::new(
        vec![("Passage: low", "2"), ("Passage: high", "9"), ("Passage: junk", "very relevant!"), ("Passage: mid", "5")],
        "0",
    );
    let reranker = FlagLlmReranker::new(chat.clone());
    assert_eq!(reranker.name(), "flag_llm");

    let chunks = vec![c("l", "low"), c("j", "junk"), c("h", "high"), c("m", "mid")];
    let out = reranker.rerank("what?", chunks, 3).unwrap();
    assert_eq!(ids(&out), vec!["h", "m", "l"]);
    assert_eq!(chat.calls().len(), 4);
}

#[test]
fn flag_llm_ties_keep_input_order() {
    let chat = ScriptedChat::new(vec![], "5");
    let out = FlagLlmReranker::new(chat).rerank("q", vec![c("a", "x"), c("b", "y"), c("c", "z")], 5).unwrap();
    assert_eq!(ids(&out), vec!["a", "b", "c"]);
}

#[test]
fn flag_llm_clips_long_passages() {
    let chat = ScriptedChat::new(vec![], "1");
    let long = "x".repeat(10_000);
    FlagLlmReranker::new(chat.clone()).rerank("q", vec![c("a", &long)], 1).unwrap();
    let prompt = &chat.calls()[0][0].content;
    assert!(prompt.contains(&"x".repeat(4000)));
    assert!(!prompt.contains(&"x".repeat(4001)));
}

#[test]
fn f_string_lists_context_then_question() {
    let prompt = FStringPrompt.make_prompt("Why?", &[c("a", "first"), c("b", "second")]).unwrap();
    let first = prompt.find("first").unwrap();
    let second = prompt.find("second").unwrap();
    let question = prompt.find("Question: Why?").unwrap();
    assert!(first < second && second < question);
    assert!(prompt.ends_with("Answer:"));
}

#[test]
fn long_context_wraps_best_passage() {
    let prompt = LongContextPrompt.make_prompt("Why?", &[c("a", "BEST"), c("b", "other")]).unwrap();
    assert_eq!(prompt.matches("BEST").count(), 2);
    let other = prompt.find("other").unwrap();
    assert!(prompt.find("BEST").unwrap() < other && prompt.rfind("BEST").unwrap() > other);
}

#[test]
fn long_context_without_chunks_matches_f_string() {
    assert_eq!(LongContextPrompt.make_prompt("Why?", &[]).unwrap(), FStringPrompt.make_prompt("Why?", &[]).unwrap());
}

#[test]
fn dynamic_prompt_returns_model_text() {
    let chat = ScriptedChat::new(vec![], "System: be brief\nUser: answer Why?");
    let maker = DynamicPrompt::new(chat.clone());
    assert_eq!(maker.name(), "dynamic_llm");
    let prompt = maker.make_prompt("Why?", &[c("a", "ctx one"), c("b", "ctx two")]).unwrap();
    assert_eq!(prompt, "System: be brief\nUser: answer Why?");

    let calls = chat.calls();
    assert_eq!(calls[0].len(), 2);
    assert_eq!(calls[0][0].role, Role::System);
    assert!(calls[0][1].content.contains("ctx one\n\n---\n\nctx two"));
    assert!(calls[0][1].content.contains("QUESTION: Why?"));
}

#[test]
fn llm_generator_returns_contexts_unchanged() {
    let chat = ScriptedChat::new(vec![], " Forty-two. ");
    let generator = LlmGenerator::new(chat);
    assert_eq!(generator.name(), "llm");
    let chunks = vec![c("a", "one"), c("b", "two")];
    let (answer, contexts) = generator.generate("prompt", chunks.clone()).unwrap();
    assert_eq!(answer, "Forty-two.");
    assert_eq!(contexts, chunks);
}

#[test]
fn chat_client_requires_endpoint_and_key() {
    let missing_endpoint = LlmSettings { endpoint: String::new(), ..LlmSettings::default() };
    assert!(ChatClient::from_settings(&missing_endpoint).is_err());

    let missing_key = LlmSettings {
        endpoint: "http://127.0.0.1:9".to_string(),
        api_key_env: "AUTORAG_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
        ..LlmSettings::default()
    };
    assert!(ChatClient::from_settings(&missing_key).is_err());
}
