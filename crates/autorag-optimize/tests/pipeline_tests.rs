mod common;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use autorag_core::traits::{Augmenter, Generator, PromptMaker, QueryExpander, Reranker, Retriever};
use autorag_core::types::{Chunk, Stage};
use autorag_optimize::{GreedyOptimizer, Manifest, PipelineConfiguration, RunSettings, SearchSpace, StageModule};
use common::*;
use serde_json::json;

type Log = Arc<Mutex<Vec<String>>>;

fn texts(chunks: &[Chunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("|")
}

struct TaggingExpander;

impl QueryExpander for TaggingExpander {
    fn name(&self) -> &str { "tagging" }

    fn expand(&self, question: &str) -> Result<String> { Ok(format!("{} (expanded)", question)) }
}

struct RecordingRetriever(Log);

impl Retriever for RecordingRetriever {
    fn name(&self) -> &str { "recording" }

    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>> {
        self.0.lock().unwrap().push(format!("retrieve:{}:{}", query, top_k));
        Ok(vec![
            Chunk::new("first passage", "well").with_id("well:0"),
            Chunk::new("second passage", "well").with_id("well:1"),
        ])
    }
}

/// Reverses the retrieved order and puts a neighbour in front.
struct NeighbourAugment;

impl Augmenter for NeighbourAugment {
    fn name(&self) -> &str { "neighbour" }

    fn augment(&self, mut chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        chunks.reverse();
        chunks.insert(0, Chunk::new("neighbour passage", "well").with_id("well:2"));
        Ok(chunks)
    }
}

struct RecordingReranker(Log);

impl Reranker for RecordingReranker {
    fn name(&self) -> &str { "recording" }

    fn rerank(&self, question: &str, mut chunks: Vec<Chunk>, top_k: usize) -> Result<Vec<Chunk>> {
        self.0.lock().unwrap().push(format!("rerank:{}:{}:{}", question, texts(&chunks), top_k));
        chunks.truncate(top_k);
        Ok(chunks)
    }
}

struct RecordingPrompt(Log);

impl PromptMaker for RecordingPrompt {
    fn name(&self) -> &str { "recording" }

    fn make_prompt(&self, question: &str, chunks: &[Chunk]) -> Result<String> {
        self.0.lock().unwrap().push(format!("prompt:{}:{}", question, texts(chunks)));
        Ok(format!("PROMPT for {}", question))
    }
}

struct RecordingGenerator(Log);

impl Generator for RecordingGenerator {
    fn name(&self) -> &str { "recording" }

    fn generate(&self, prompt: &str, chunks: Vec<Chunk>) -> Result<(String, Vec<Chunk>)> {
        self.0.lock().unwrap().push(format!("generate:{}:{}", prompt, chunks.len()));
        Ok(("at the crossroads".to_string(), chunks))
    }
}

fn recording_modules(log: &Log) -> Vec<StageModule> {
    vec![
        StageModule::QueryExpansion(Arc::new(TaggingExpander)),
        StageModule::Retrieval(Arc::new(RecordingRetriever(log.clone()))),
        StageModule::Augmentation(Arc::new(NeighbourAugment)),
        StageModule::Reranker(Arc::new(RecordingReranker(log.clone()))),
        StageModule::PromptMaker(Arc::new(RecordingPrompt(log.clone()))),
        StageModule::Generator(Arc::new(RecordingGenerator(log.clone()))),
    ]
}

const QUESTION: &str = "Where is the well?";

fn expected_calls() -> Vec<String> {
    vec![
        format!("retrieve:{} (expanded):2", QUESTION),
        format!("rerank:{}:neighbour passage|second passage|first passage:2", QUESTION),
        format!("prompt:{}:neighbour passage|second passage", QUESTION),
        format!("generate:PROMPT for {}:2", QUESTION),
    ]
}

#[test]
fn stages_see_expanded_query_only_at_retrieval() {
    let log: Log = Arc::default();
    let config = PipelineConfiguration::from_modules(recording_modules(&log)).expect("config");
    let settings = RunSettings { retrieval_top_k: 2, rerank_top_k: 2 };

    let out = config.answer(QUESTION, &settings).expect("answer");
    assert_eq!(*log.lock().unwrap(), expected_calls());
    assert_eq!(out.question, QUESTION);
    assert_eq!(out.prompt, format!("PROMPT for {}", QUESTION));
    assert_eq!(out.answer, "at the crossroads");
    assert_eq!(out.retrieved_contexts, vec!["first passage".to_string(), "second passage".to_string()]);
}

#[test]
fn evaluator_receives_raw_retrieval_and_original_question() {
    let log: Log = Arc::default();
    let mut manifest = Manifest::new();
    for module in recording_modules(&log) {
        let (stage, label) = (module.stage(), module.name().to_string());
        manifest.register(stage, label, move || Ok(module.clone()));
    }
    let space = SearchSpace::from_manifest(manifest);
    let evaluator = FnEvaluator::new(|_| Ok(metrics("context_precision", json!(1.0))));

    let report = GreedyOptimizer::new(&space, &evaluator, "context_precision")
        .with_settings(RunSettings { retrieval_top_k: 2, rerank_top_k: 2 })
        .optimize(&[record(QUESTION, "at the crossroads")])
        .expect("optimize");

    assert_eq!(report.evaluations, Stage::ALL.len());
    let every_trial: Vec<String> = (0..Stage::ALL.len()).flat_map(|_| expected_calls()).collect();
    assert_eq!(*log.lock().unwrap(), every_trial);
    for batch in evaluator.batches.lock().unwrap().iter() {
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].question, QUESTION);
        assert_eq!(batch[0].predicted_answer, "at the crossroads");
        assert_eq!(batch[0].retrieved_contexts, vec!["first passage".to_string(), "second passage".to_string()]);
    }
}
