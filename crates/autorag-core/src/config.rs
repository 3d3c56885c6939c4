//! Lightweight configuration loader, typed settings sections, and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`APP_FUSION__ALPHA=0.5` sets `fusion.alpha`). Provides helpers to expand `~`
//! and `${VAR}` in configured paths.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::types::Stage;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Build from an explicit figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract a settings section, falling back to its defaults when absent.
    pub fn section<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: DeserializeOwned + Default,
    {
        if self.figment.find_value(key).is_err() {
            return Ok(T::default());
        }
        self.get(key)
    }

    pub fn fusion(&self) -> anyhow::Result<FusionSettings> { self.section("fusion") }
    pub fn optimizer(&self) -> anyhow::Result<OptimizerSettings> { self.section("optimizer") }
    pub fn data(&self) -> anyhow::Result<DataSettings> { self.section("data") }
    pub fn llm(&self) -> anyhow::Result<LlmSettings> { self.section("llm") }
    pub fn evaluator(&self) -> anyhow::Result<EvaluatorSettings> { self.section("evaluator") }
    pub fn search_space(&self) -> anyhow::Result<SearchSpaceSettings> { self.section("search_space") }

    fn validate(&self) -> anyhow::Result<()> {
        let fusion = self.fusion()?;
        if !(0.0..=1.0).contains(&fusion.alpha) {
            anyhow::bail!(crate::error::Error::InvalidConfig(format!("fusion.alpha must be within [0, 1], got {}", fusion.alpha)));
        }
        let optimizer = self.optimizer()?;
        if optimizer.retrieval_top_k == 0 || optimizer.rerank_top_k == 0 {
            anyhow::bail!(crate::error::Error::InvalidConfig("optimizer top-k values must be positive".to_string()));
        }
        Ok(())
    }
}

/// DBSF hybrid retrieval knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    /// Weight of the sparse ranking; the dense ranking gets `1 - alpha`.
    pub alpha: f64,
    /// How many candidates the dense sub-retriever pulls per query.
    pub dense_candidates: usize,
}

impl Default for FusionSettings {
    fn default() -> Self { Self { alpha: 0.7, dense_candidates: 100 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub retrieval_top_k: usize,
    pub rerank_top_k: usize,
    pub target_metric: String,
    pub ground_truth_path: String,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            retrieval_top_k: 10,
            rerank_top_k: 5,
            target_metric: "context_precision".to_string(),
            ground_truth_path: "ground_truth.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub raw_txt_dir: String,
    pub lancedb_dir: String,
    pub table: String,
    /// On-disk BM25 index location; `None` keeps the index in memory.
    pub tantivy_index_dir: Option<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            raw_txt_dir: "../dev_data/txt".to_string(),
            lancedb_dir: "../dev_data/indexes/lancedb".to_string(),
            table: "autorag_documents".to_string(),
            tantivy_index_dir: None,
        }
    }
}

/// OpenAI-compatible chat endpoint (Azure deployments included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
    /// Name of the env var holding the key; the key itself never lives in config.
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment: "gpt-4o-mini".to_string(),
            api_version: "2024-02-15-preview".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.3,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    #[default]
    Reference,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EvaluatorSettings {
    pub kind: EvaluatorKind,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Candidate names enabled for each stage, in registry order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpaceSettings {
    pub query_expansion: Vec<String>,
    pub retrieval: Vec<String>,
    pub augmentation: Vec<String>,
    pub reranker: Vec<String>,
    pub prompt_maker: Vec<String>,
    pub generator: Vec<String>,
}

impl SearchSpaceSettings {
    pub fn names(&self, stage: Stage) -> &[String] {
        match stage {
            Stage::QueryExpansion => &self.query_expansion,
            Stage::Retrieval => &self.retrieval,
            Stage::Augmentation => &self.augmentation,
            Stage::Reranker => &self.reranker,
            Stage::PromptMaker => &self.prompt_maker,
            Stage::Generator => &self.generator,
        }
    }
}

impl Default for SearchSpaceSettings {
    fn default() -> Self {
        let names = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            query_expansion: names(&["pass", "hyde"]),
            retrieval: names(&["bm25", "hybrid_dbsf"]),
            augmentation: names(&["pass", "prev_next"]),
            reranker: names(&["pass", "flag_llm"]),
            prompt_maker: names(&["f_string", "long_context_reorder", "dynamic_llm"]),
            generator: names(&["llm"]),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
