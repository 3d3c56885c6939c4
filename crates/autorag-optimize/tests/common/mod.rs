#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use autorag_core::ground_truth::{Answer, GroundTruthRecord};
use autorag_core::traits::{Evaluator, Generator, MetricMap, Retriever};
use autorag_core::types::{Chunk, ScoreRecord, Stage};
use autorag_modules::{FStringPrompt, NoAugment, PassExpander, PassReranker};
use autorag_optimize::{Manifest, StageModule};
use serde_json::json;

pub fn record(question: &str, answer: &str) -> GroundTruthRecord {
    GroundTruthRecord {
        question: question.to_string(),
        answer: Answer::One(answer.to_string()),
        chunk_id: "doc:0".to_string(),
        chunk_text: "reference".to_string(),
    }
}

/// Returns the same passages for every query; fails for questions listed in
/// `fail_on`.
pub struct FixedRetriever {
    pub name: &'static str,
    pub texts: Vec<&'static str>,
    pub fail_on: Vec<&'static str>,
}

impl FixedRetriever {
    pub fn module(name: &'static str, texts: &[&'static str]) -> StageModule {
        StageModule::Retrieval(Arc::new(Self { name, texts: texts.to_vec(), fail_on: vec![] }))
    }
}

impl Retriever for FixedRetriever {
    fn name(&self) -> &str { self.name }

    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>> {
        if self.fail_on.iter().any(|q| *q == query) {
            bail!("retriever {} cannot serve '{}'", self.name, query);
        }
        Ok(self.texts.iter().enumerate().take(top_k).map(|(i, t)| Chunk::new(*t, "src").with_id(format!("{}:{}", self.name, i))).collect())
    }
}

pub struct FixedGenerator {
    pub name: &'static str,
    pub answer: &'static str,
}

impl FixedGenerator {
    pub fn module(name: &'static str, answer: &'static str) -> StageModule {
        StageModule::Generator(Arc::new(Self { name, answer }))
    }
}

impl Generator for FixedGenerator {
    fn name(&self) -> &str { self.name }

    fn generate(&self, _prompt: &str, chunks: Vec<Chunk>) -> Result<(String, Vec<Chunk>)> {
        Ok((self.answer.to_string(), chunks))
    }
}

type ScoreFn = dyn Fn(&[ScoreRecord]) -> Result<MetricMap> + Send + Sync;

/// Evaluator backed by a closure; remembers every batch it was given.
pub struct FnEvaluator {
    f: Box<ScoreFn>,
    pub calls: AtomicUsize,
    pub batches: Mutex<Vec<Vec<ScoreRecord>>>,
}

impl FnEvaluator {
    pub fn new(f: impl Fn(&[ScoreRecord]) -> Result<MetricMap> + Send + Sync + 'static) -> Self {
        Self { f: Box::new(f), calls: AtomicUsize::new(0), batches: Mutex::new(Vec::new()) }
    }

    /// `context_precision` looked up from the first retrieved context of the
    /// first record; 0.1 when nothing matches.
    pub fn by_first_context(table: &'static [(&'static str, f64)]) -> Self {
        Self::new(move |records| {
            let first = records.first().and_then(|r| r.retrieved_contexts.first()).cloned().unwrap_or_default();
            let score = table.iter().find(|(t, _)| *t == first).map(|(_, s)| *s).unwrap_or(0.1);
            Ok(metrics("context_precision", json!(score)))
        })
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Evaluator for FnEvaluator {
    fn score(&self, records: &[ScoreRecord]) -> Result<MetricMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(records.to_vec());
        (self.f)(records)
    }
}

pub fn metrics(name: &str, value: serde_json::Value) -> MetricMap {
    let mut m = MetricMap::new();
    m.insert(name.to_string(), value);
    m
}

/// One candidate for every stage except those given.
pub fn manifest_with(retrievers: Vec<StageModule>, generators: Vec<StageModule>) -> Manifest {
    let mut manifest = Manifest::new();
    manifest.register(Stage::QueryExpansion, "pass", || Ok(StageModule::QueryExpansion(Arc::new(PassExpander))));
    for module in retrievers {
        let label = module.name().to_string();
        manifest.register(Stage::Retrieval, label, move || Ok(module.clone()));
    }
    manifest.register(Stage::Augmentation, "pass", || Ok(StageModule::Augmentation(Arc::new(NoAugment))));
    manifest.register(Stage::Reranker, "pass", || Ok(StageModule::Reranker(Arc::new(PassReranker))));
    manifest.register(Stage::PromptMaker, "f_string", || Ok(StageModule::PromptMaker(Arc::new(FStringPrompt))));
    for module in generators {
        let label = module.name().to_string();
        manifest.register(Stage::Generator, label, move || Ok(module.clone()));
    }
    manifest
}
