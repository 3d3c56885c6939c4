use std::collections::{HashMap, HashSet};

use anyhow::Result;
use autorag_core::ground_truth::GroundTruthRecord;
use autorag_core::traits::{Evaluator, MetricMap};
use autorag_core::types::ScoreRecord;
use serde_json::json;

pub const CONTEXT_PRECISION: &str = "context_precision";
pub const ANSWER_OVERLAP: &str = "answer_overlap";

/// Offline evaluator that scores against the reference chunks recorded in the
/// ground truth.
///
/// `context_precision` is the mean average precision of the retrieved
/// contexts, where a context counts as relevant when it contains the
/// reference chunk text or is contained in it (compared after collapsing
/// whitespace and case). `answer_overlap` is the mean best token F1 of the
/// predicted answer against the reference answers.
pub struct ReferenceContextEvaluator {
    references: HashMap<String, Vec<String>>,
}

impl ReferenceContextEvaluator {
    pub fn new(ground_truth: &[GroundTruthRecord]) -> Self {
        let mut references: HashMap<String, Vec<String>> = HashMap::new();
        for record in ground_truth {
            let text = normalize(&record.chunk_text);
            if !text.is_empty() {
                references.entry(record.question.clone()).or_default().push(text);
            }
        }
        Self { references }
    }

    fn is_relevant(&self, question: &str, context: &str) -> bool {
        let Some(refs) = self.references.get(question) else { return false };
        let context = normalize(context);
        if context.is_empty() {
            return false;
        }
        refs.iter().any(|r| context.contains(r.as_str()) || r.contains(context.as_str()))
    }

    fn average_precision(&self, record: &ScoreRecord) -> f64 {
        let mut hits = 0usize;
        let mut sum = 0.0;
        for (i, context) in record.retrieved_contexts.iter().enumerate() {
            if self.is_relevant(&record.question, context) {
                hits += 1;
                sum += hits as f64 / (i + 1) as f64;
            }
        }
        if hits == 0 { 0.0 } else { sum / hits as f64 }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().map(|w| w.to_lowercase()).collect::<Vec<_>>().join(" ")
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).map(|t| t.to_lowercase()).collect()
}

/// Bag-of-tokens F1 between a prediction and one reference.
pub(crate) fn token_f1(predicted: &str, reference: &str) -> f64 {
    let pred = tokens(predicted);
    let refs = tokens(reference);
    if pred.is_empty() || refs.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in &refs {
        *counts.entry(t.as_str()).or_default() += 1;
    }
    let mut common = 0usize;
    for t in &pred {
        if let Some(n) = counts.get_mut(t.as_str()) {
            if *n > 0 {
                *n -= 1;
                common += 1;
            }
        }
    }
    if common == 0 {
        return 0.0;
    }
    let precision = common as f64 / pred.len() as f64;
    let recall = common as f64 / refs.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

impl Evaluator for ReferenceContextEvaluator {
    fn score(&self, records: &[ScoreRecord]) -> Result<MetricMap> {
        let mut metrics = MetricMap::new();
        if records.is_empty() {
            metrics.insert(CONTEXT_PRECISION.to_string(), json!(0.0));
            metrics.insert(ANSWER_OVERLAP.to_string(), json!(0.0));
            return Ok(metrics);
        }
        let n = records.len() as f64;
        let precision: f64 = records.iter().map(|r| self.average_precision(r)).sum::<f64>() / n;
        let overlap: f64 = records
            .iter()
            .map(|r| r.reference_answers.iter().map(|a| token_f1(&r.predicted_answer, a)).fold(0.0, f64::max))
            .sum::<f64>()
            / n;
        let unknown: HashSet<&str> = records
            .iter()
            .map(|r| r.question.as_str())
            .filter(|q| !self.references.contains_key(*q))
            .collect();
        if !unknown.is_empty() {
            tracing::debug!(count = unknown.len(), "questions without reference chunk text score zero precision");
        }
        metrics.insert(CONTEXT_PRECISION.to_string(), json!(precision));
        metrics.insert(ANSWER_OVERLAP.to_string(), json!(overlap));
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_f1_counts_multiset_overlap() {
        assert_eq!(token_f1("boil the water", "Boil the water."), 1.0);
        assert_eq!(token_f1("", "anything"), 0.0);
        assert_eq!(token_f1("fire", "water"), 0.0);
        // pred {a, a}, ref {a, b}: common 1, p 0.5, r 0.5
        assert!((token_f1("a a", "a b") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Boil\n\tTHE   water "), "boil the water");
    }
}
