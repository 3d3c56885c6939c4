//! Ground-truth question/answer set, persisted as a JSON array.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Reference answer(s): the store may hold one string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    One(String),
    Many(Vec<String>),
}

impl Answer {
    pub fn references(&self) -> Vec<String> {
        match self {
            Answer::One(a) => vec![a.clone()],
            Answer::Many(all) => all.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthRecord {
    pub question: String,
    pub answer: Answer,
    pub chunk_id: String,
    pub chunk_text: String,
}

/// Load and validate a ground-truth file. Malformed JSON, a non-array
/// document, or an empty set are all rejected.
pub fn load(path: &Path) -> Result<Vec<GroundTruthRecord>> {
    let shown = path.display().to_string();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::GroundTruth { path: shown.clone(), reason: e.to_string() })?;
    let records = parse(&raw).map_err(|e| match e {
        Error::GroundTruth { reason, .. } => Error::GroundTruth { path: shown.clone(), reason },
        other => other,
    })?;
    tracing::info!(path = %shown, records = records.len(), "loaded ground truth");
    Ok(records)
}

pub fn parse(raw: &str) -> Result<Vec<GroundTruthRecord>> {
    let invalid = |reason: String| Error::GroundTruth { path: "<inline>".to_string(), reason };
    let records: Vec<GroundTruthRecord> = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
    if records.is_empty() {
        return Err(invalid("no records".to_string()));
    }
    if let Some(i) = records.iter().position(|r| r.question.trim().is_empty()) {
        return Err(invalid(format!("record {} has an empty question", i)));
    }
    Ok(records)
}

pub fn save(path: &Path, records: &[GroundTruthRecord]) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(records)?)?;
    Ok(())
}
