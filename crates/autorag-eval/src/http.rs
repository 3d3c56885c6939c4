use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use autorag_core::traits::{Evaluator, MetricMap};
use autorag_core::types::ScoreRecord;
use reqwest::Client;

/// Delegates scoring to an external service: the records are POSTed as a
/// JSON array and the reply must be a JSON object of metric values.
pub struct HttpEvaluator {
    rt: tokio::runtime::Runtime,
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpEvaluator {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(anyhow!("evaluator endpoint is empty"));
        }
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self { rt, client: Client::new(), endpoint, timeout: Duration::from_secs(timeout_secs.max(1)) })
    }

    async fn post(&self, records: &[ScoreRecord]) -> Result<MetricMap> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(records)
            .send()
            .await
            .with_context(|| format!("POST {}", self.endpoint))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("evaluator returned HTTP {}: {}", status, body));
        }
        let value: serde_json::Value = response.json().await.context("parse evaluator response")?;
        match value {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(anyhow!("evaluator response is not a JSON object: {}", other)),
        }
    }
}

impl Evaluator for HttpEvaluator {
    fn score(&self, records: &[ScoreRecord]) -> Result<MetricMap> {
        let metrics = self.rt.block_on(self.post(records))?;
        tracing::debug!(records = records.len(), metrics = ?metrics.keys().collect::<Vec<_>>(), "remote evaluation");
        Ok(metrics)
    }
}
