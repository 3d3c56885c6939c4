//! autorag-modules
//!
//! Stage candidates for everything except retrieval (which lives next to its
//! indexes in `autorag-text` and `autorag-hybrid`), and the chat-model client
//! the LLM-backed candidates share.

pub mod augmentation;
pub mod generator;
pub mod llm;
pub mod prompt_maker;
pub mod query_expansion;
pub mod reranker;

pub use augmentation::{NeighborMode, NoAugment, PrevNextAugment};
pub use generator::LlmGenerator;
pub use llm::{ChatClient, ChatMessage, ChatModel, Role};
pub use prompt_maker::{DynamicPrompt, FStringPrompt, LongContextPrompt};
pub use query_expansion::{HydeExpander, PassExpander};
pub use reranker::{FlagLlmReranker, PassReranker};
