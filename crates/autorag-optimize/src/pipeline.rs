use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use autorag_core::config::OptimizerSettings;
use autorag_core::error::{Error, Result};
use autorag_core::traits::{Augmenter, Generator, PromptMaker, QueryExpander, Reranker, Retriever};
use autorag_core::types::Stage;
use serde::Serialize;

use crate::registry::StageModule;

/// Depths used when running a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub retrieval_top_k: usize,
    pub rerank_top_k: usize,
}

impl Default for RunSettings {
    fn default() -> Self { Self { retrieval_top_k: 10, rerank_top_k: 5 } }
}

impl From<&OptimizerSettings> for RunSettings {
    fn from(s: &OptimizerSettings) -> Self {
        Self { retrieval_top_k: s.retrieval_top_k, rerank_top_k: s.rerank_top_k }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub question: String,
    pub answer: String,
    pub prompt: String,
    /// Retrieval output before augmentation and reranking.
    pub retrieved_contexts: Vec<String>,
}

/// Exactly one candidate per stage.
#[derive(Clone)]
pub struct PipelineConfiguration {
    pub query_expansion: Arc<dyn QueryExpander>,
    pub retrieval: Arc<dyn Retriever>,
    pub augmentation: Arc<dyn Augmenter>,
    pub reranker: Arc<dyn Reranker>,
    pub prompt_maker: Arc<dyn PromptMaker>,
    pub generator: Arc<dyn Generator>,
}

impl PipelineConfiguration {
    /// Assemble a configuration from modules in any order. Later modules of
    /// the same stage replace earlier ones; a stage left unfilled is an error.
    pub fn from_modules(modules: impl IntoIterator<Item = StageModule>) -> Result<Self> {
        let (mut qe, mut rt, mut au, mut rr, mut pm, mut gn) = (None, None, None, None, None, None);
        for module in modules {
            match module {
                StageModule::QueryExpansion(m) => qe = Some(m),
                StageModule::Retrieval(m) => rt = Some(m),
                StageModule::Augmentation(m) => au = Some(m),
                StageModule::Reranker(m) => rr = Some(m),
                StageModule::PromptMaker(m) => pm = Some(m),
                StageModule::Generator(m) => gn = Some(m),
            }
        }
        Ok(Self {
            query_expansion: qe.ok_or(Error::EmptyStage(Stage::QueryExpansion))?,
            retrieval: rt.ok_or(Error::EmptyStage(Stage::Retrieval))?,
            augmentation: au.ok_or(Error::EmptyStage(Stage::Augmentation))?,
            reranker: rr.ok_or(Error::EmptyStage(Stage::Reranker))?,
            prompt_maker: pm.ok_or(Error::EmptyStage(Stage::PromptMaker))?,
            generator: gn.ok_or(Error::EmptyStage(Stage::Generator))?,
        })
    }

    /// Copy of this configuration with one stage swapped out.
    pub fn with_module(&self, module: &StageModule) -> Self {
        let mut next = self.clone();
        match module {
            StageModule::QueryExpansion(m) => next.query_expansion = m.clone(),
            StageModule::Retrieval(m) => next.retrieval = m.clone(),
            StageModule::Augmentation(m) => next.augmentation = m.clone(),
            StageModule::Reranker(m) => next.reranker = m.clone(),
            StageModule::PromptMaker(m) => next.prompt_maker = m.clone(),
            StageModule::Generator(m) => next.generator = m.clone(),
        }
        next
    }

    pub fn module_name(&self, stage: Stage) -> &str {
        match stage {
            Stage::QueryExpansion => self.query_expansion.name(),
            Stage::Retrieval => self.retrieval.name(),
            Stage::Augmentation => self.augmentation.name(),
            Stage::Reranker => self.reranker.name(),
            Stage::PromptMaker => self.prompt_maker.name(),
            Stage::Generator => self.generator.name(),
        }
    }

    pub fn module_names(&self) -> Vec<(Stage, String)> {
        Stage::ALL.iter().map(|s| (*s, self.module_name(*s).to_string())).collect()
    }

    /// Run all six stages for one question.
    pub fn answer(&self, question: &str, settings: &RunSettings) -> anyhow::Result<PipelineOutput> {
        let query = self
            .query_expansion
            .expand(question)
            .with_context(|| format!("query_expansion '{}'", self.query_expansion.name()))?;
        let retrieved = self
            .retrieval
            .retrieve(&query, settings.retrieval_top_k)
            .with_context(|| format!("retrieval '{}'", self.retrieval.name()))?;
        let retrieved_contexts = retrieved.iter().map(|c| c.text.clone()).collect();
        let augmented = self
            .augmentation
            .augment(retrieved)
            .with_context(|| format!("augmentation '{}'", self.augmentation.name()))?;
        let reranked = self
            .reranker
            .rerank(question, augmented, settings.rerank_top_k)
            .with_context(|| format!("reranker '{}'", self.reranker.name()))?;
        let prompt = self
            .prompt_maker
            .make_prompt(question, &reranked)
            .with_context(|| format!("prompt_maker '{}'", self.prompt_maker.name()))?;
        let (answer, _contexts) = self
            .generator
            .generate(&prompt, reranked)
            .with_context(|| format!("generator '{}'", self.generator.name()))?;
        Ok(PipelineOutput { question: question.to_string(), answer, prompt, retrieved_contexts })
    }
}

impl fmt::Display for PipelineConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = Stage::ALL.iter().map(|s| format!("{}={}", s, self.module_name(*s))).collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl fmt::Debug for PipelineConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelineConfiguration({})", self)
    }
}
