use autorag_core::error::{Error, Result};
use autorag_core::ground_truth::GroundTruthRecord;
use autorag_core::traits::Evaluator;
use autorag_core::types::{ScoreRecord, Stage};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use crate::metric::extract_metric;
use crate::pipeline::{PipelineConfiguration, RunSettings};
use crate::registry::SearchSpace;

/// One full-pipeline evaluation of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trial {
    pub stage: Stage,
    pub candidate: String,
    pub score: f64,
    /// Ground-truth records skipped because a stage failed on them.
    pub failed_records: usize,
}

#[derive(Debug, Clone)]
pub struct OptimizationReport {
    pub configuration: PipelineConfiguration,
    pub trials: Vec<Trial>,
    pub evaluations: usize,
}

impl OptimizationReport {
    /// Winning trial for `stage`: highest score, earliest on ties.
    pub fn best_trial(&self, stage: Stage) -> Option<&Trial> {
        self.trials
            .iter()
            .filter(|t| t.stage == stage)
            .fold(None, |best: Option<&Trial>, t| match best {
                Some(b) if t.score <= b.score => Some(b),
                _ => Some(t),
            })
    }
}

/// Picks one candidate per stage, stage by stage, keeping every other stage
/// fixed at its current choice.
pub struct GreedyOptimizer<'a> {
    space: &'a SearchSpace,
    evaluator: &'a dyn Evaluator,
    settings: RunSettings,
    target_metric: String,
}

impl<'a> GreedyOptimizer<'a> {
    pub fn new(space: &'a SearchSpace, evaluator: &'a dyn Evaluator, target_metric: impl Into<String>) -> Self {
        Self { space, evaluator, settings: RunSettings::default(), target_metric: target_metric.into() }
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn optimize(&self, ground_truth: &[GroundTruthRecord]) -> Result<OptimizationReport> {
        if ground_truth.is_empty() {
            return Err(Error::GroundTruth { path: "<memory>".to_string(), reason: "no records".to_string() });
        }
        let mut working = self.space.default_configuration()?;

        let counts = self.space.counts();
        let greedy_trials: usize = counts.values().sum();
        let combinatorial = counts.values().fold(1u64, |acc, n| acc.saturating_mul(*n as u64));
        info!(greedy_trials, combinatorial, records = ground_truth.len(), metric = %self.target_metric, "starting greedy optimisation");

        let pb = ProgressBar::new(greedy_trials as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} trials {msg}") {
            pb.set_style(style.progress_chars("#>-"));
        }

        let mut trials = Vec::with_capacity(greedy_trials);
        for stage in Stage::ALL {
            let mut best: Option<(f64, PipelineConfiguration)> = None;
            for candidate in self.space.candidates(stage) {
                let config = working.with_module(candidate);
                pb.set_message(format!("{}={}", stage, candidate.name()));
                let (score, failed_records) = self.evaluate(&config, ground_truth);
                pb.inc(1);
                info!(%stage, candidate = candidate.name(), score, failed_records, "trial");
                trials.push(Trial { stage, candidate: candidate.name().to_string(), score, failed_records });
                if best.as_ref().map_or(true, |(b, _)| score > *b) {
                    best = Some((score, config));
                }
            }
            if let Some((score, config)) = best {
                info!(%stage, candidate = config.module_name(stage), score, "locked in");
                working = config;
            }
        }
        pb.finish_and_clear();
        info!(configuration = %working, evaluations = trials.len(), "greedy optimisation complete");

        Ok(OptimizationReport { configuration: working, evaluations: trials.len(), trials })
    }

    /// Score one configuration over the ground truth. Returns the metric and
    /// the number of records that had to be skipped.
    fn evaluate(&self, config: &PipelineConfiguration, ground_truth: &[GroundTruthRecord]) -> (f64, usize) {
        let mut records = Vec::with_capacity(ground_truth.len());
        let mut failed = 0usize;
        for gt in ground_truth {
            match config.answer(&gt.question, &self.settings) {
                Ok(out) => records.push(ScoreRecord {
                    question: out.question,
                    predicted_answer: out.answer,
                    reference_answers: gt.answer.references(),
                    retrieved_contexts: out.retrieved_contexts,
                }),
                Err(e) => {
                    failed += 1;
                    warn!(configuration = %config, question = %gt.question, error = %format!("{:#}", e), "record skipped");
                }
            }
        }
        if records.is_empty() {
            warn!(configuration = %config, "every record failed; scoring 0.0");
            return (0.0, failed);
        }

        let metrics = match self.evaluator.score(&records) {
            Ok(m) => m,
            Err(e) => {
                warn!(configuration = %config, error = %e, "evaluator failed; scoring 0.0");
                return (0.0, failed);
            }
        };
        match extract_metric(&metrics, &self.target_metric) {
            Some(score) => (score, failed),
            None => {
                warn!(
                    configuration = %config,
                    metric = %self.target_metric,
                    got = ?metrics.get(&self.target_metric),
                    "metric missing or not numeric; scoring 0.0"
                );
                (0.0, failed)
            }
        }
    }
}
