mod catalog;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use autorag_core::config::{expand_path, Config, EvaluatorKind};
use autorag_core::data_processor::DataProcessor;
use autorag_core::ground_truth::{self, GroundTruthRecord};
use autorag_core::traits::{DenseSearch, Evaluator};
use autorag_core::types::Stage;
use autorag_embed::get_default_embedder;
use autorag_eval::{HttpEvaluator, ReferenceContextEvaluator};
use autorag_modules::{ChatClient, ChatModel};
use autorag_optimize::{GreedyOptimizer, OptimizationReport, RunSettings, SearchSpace};
use autorag_text::Bm25Index;
use autorag_vector::LanceStore;
use tracing_subscriber::EnvFilter;

use crate::catalog::{build_manifest, Resources};

const USAGE: &str = "Usage: autorag <build [txt_dir] [max_files] | optimize | ask \"<question>\">";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn parse_max_files(arg: Option<&String>) -> anyhow::Result<Option<usize>> {
    arg.map(|n| n.parse::<usize>().with_context(|| format!("max_files must be a number, got '{}'", n)))
        .transpose()
}

fn open_store(config: &Config) -> anyhow::Result<LanceStore> {
    let data = config.data()?;
    let path = expand_path(&data.lancedb_dir);
    LanceStore::open(&path, &data.table, get_default_embedder()?)
}

/// Chunk the text corpus into the vector store, and into an on-disk BM25
/// index when one is configured. `max_files` caps how many files are read.
fn build(config: &Config, dir: Option<&String>, max_files: Option<usize>) -> anyhow::Result<()> {
    let data = config.data()?;
    let data_dir = dir.map(PathBuf::from).unwrap_or_else(|| expand_path(&data.raw_txt_dir));
    tracing::info!(dir = %data_dir.display(), max_files, "ingesting");
    let processor = DataProcessor::new();
    let chunks = match max_files {
        Some(limit) => processor.process_directory_limited(&data_dir, limit)?,
        None => processor.process_directory(&data_dir)?,
    };
    let written = open_store(config)?.upsert(&chunks)?;
    if let Some(dir) = &data.tantivy_index_dir {
        let index = Bm25Index::build_in_dir(&expand_path(dir), &chunks)?;
        tracing::info!(docs = index.len(), "bm25 index written");
    }
    println!("Build complete ({} chunks)", written);
    Ok(())
}

fn load_sparse(config: &Config, store: &LanceStore) -> anyhow::Result<Bm25Index> {
    if let Some(dir) = config.data()?.tantivy_index_dir {
        let dir = expand_path(dir);
        if dir.exists() {
            return Bm25Index::open(&dir);
        }
        tracing::warn!(dir = %dir.display(), "bm25 index directory missing; rebuilding in memory");
    }
    let corpus = store.all_chunks()?;
    if corpus.is_empty() {
        anyhow::bail!("the vector store is empty; run `autorag build` first");
    }
    Bm25Index::build_in_ram(&corpus)
}

fn build_evaluator(config: &Config, ground_truth: &[GroundTruthRecord]) -> anyhow::Result<Box<dyn Evaluator>> {
    let settings = config.evaluator()?;
    Ok(match settings.kind {
        EvaluatorKind::Reference => Box::new(ReferenceContextEvaluator::new(ground_truth)),
        EvaluatorKind::Http => {
            let endpoint = settings.endpoint.context("evaluator.endpoint is required for the http evaluator")?;
            Box::new(HttpEvaluator::new(endpoint, settings.timeout_secs.unwrap_or(60))?)
        }
    })
}

fn optimize(config: &Config) -> anyhow::Result<OptimizationReport> {
    let optimizer_settings = config.optimizer()?;
    let ground_truth = ground_truth::load(&expand_path(&optimizer_settings.ground_truth_path))?;

    let store = open_store(config)?;
    let sparse = Arc::new(load_sparse(config, &store)?);
    let dense: Arc<dyn DenseSearch> = Arc::new(store);
    let llm = ChatClient::from_settings(&config.llm()?)
        .map(|c| Arc::new(c) as Arc<dyn ChatModel>)
        .map_err(|e| format!("{:#}", e));
    if let Err(e) = &llm {
        tracing::warn!(error = %e, "chat model unavailable; LLM-backed candidates will be skipped");
    }
    let resources = Resources { sparse, dense, fusion: config.fusion()?, llm };

    let space = SearchSpace::from_manifest(build_manifest(&config.search_space()?, &resources));
    let evaluator = build_evaluator(config, &ground_truth)?;
    let report = GreedyOptimizer::new(&space, evaluator.as_ref(), optimizer_settings.target_metric.clone())
        .with_settings(RunSettings::from(&optimizer_settings))
        .optimize(&ground_truth)?;
    Ok(report)
}

fn print_report(report: &OptimizationReport) {
    println!("Trials ({}):", report.evaluations);
    for t in &report.trials {
        println!("  {:<16} {:<22} {:.4}  skipped={}", t.stage.as_str(), t.candidate, t.score, t.failed_records);
    }
    println!("Selected pipeline:");
    for stage in Stage::ALL {
        println!("  {:<16} {}", stage.as_str(), report.configuration.module_name(stage));
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "build" => build(&config, args.first(), parse_max_files(args.get(1))?)?,
        "optimize" => print_report(&optimize(&config)?),
        "ask" => {
            let Some(question) = args.first() else {
                eprintln!("Usage: autorag ask \"<question>\"");
                std::process::exit(1);
            };
            let report = optimize(&config)?;
            print_report(&report);
            let settings = RunSettings::from(&config.optimizer()?);
            let output = report.configuration.answer(question, &settings)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            eprintln!("Unknown command: {}\n{}", cmd, USAGE);
            std::process::exit(1);
        }
    }
    Ok(())
}
