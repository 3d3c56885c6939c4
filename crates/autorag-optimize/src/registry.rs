use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use autorag_core::error::{Error, Result};
use autorag_core::traits::{Augmenter, Generator, PromptMaker, QueryExpander, Reranker, Retriever};
use autorag_core::types::Stage;
use tracing::{info, warn};

use crate::pipeline::PipelineConfiguration;

/// One instantiated candidate, tagged with the stage it can fill.
#[derive(Clone)]
pub enum StageModule {
    QueryExpansion(Arc<dyn QueryExpander>),
    Retrieval(Arc<dyn Retriever>),
    Augmentation(Arc<dyn Augmenter>),
    Reranker(Arc<dyn Reranker>),
    PromptMaker(Arc<dyn PromptMaker>),
    Generator(Arc<dyn Generator>),
}

impl StageModule {
    pub fn stage(&self) -> Stage {
        match self {
            StageModule::QueryExpansion(_) => Stage::QueryExpansion,
            StageModule::Retrieval(_) => Stage::Retrieval,
            StageModule::Augmentation(_) => Stage::Augmentation,
            StageModule::Reranker(_) => Stage::Reranker,
            StageModule::PromptMaker(_) => Stage::PromptMaker,
            StageModule::Generator(_) => Stage::Generator,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            StageModule::QueryExpansion(m) => m.name(),
            StageModule::Retrieval(m) => m.name(),
            StageModule::Augmentation(m) => m.name(),
            StageModule::Reranker(m) => m.name(),
            StageModule::PromptMaker(m) => m.name(),
            StageModule::Generator(m) => m.name(),
        }
    }
}

impl fmt::Debug for StageModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.stage(), self.name())
    }
}

pub type Factory = Box<dyn Fn() -> anyhow::Result<StageModule> + Send + Sync>;

struct ManifestEntry {
    stage: Stage,
    label: String,
    factory: Factory,
}

/// Ordered list of candidate factories. Registration order is the order
/// candidates are tried in.
#[derive(Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self { Self::default() }

    pub fn register<F>(&mut self, stage: Stage, label: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<StageModule> + Send + Sync + 'static,
    {
        self.entries.push(ManifestEntry { stage, label: label.into(), factory: Box::new(factory) });
        self
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// `(stage, label)` pairs in registration order.
    pub fn labels(&self) -> Vec<(Stage, &str)> {
        self.entries.iter().map(|e| (e.stage, e.label.as_str())).collect()
    }
}

impl fmt::Debug for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|e| format!("{}:{}", e.stage, e.label))).finish()
    }
}

/// Instantiated candidates per stage, built from a [`Manifest`].
///
/// Mutation (`refresh`, `reload`, `clear`) needs `&mut self`, so it cannot
/// overlap an optimizer run holding `&SearchSpace`.
pub struct SearchSpace {
    manifest: Manifest,
    modules: BTreeMap<Stage, Vec<StageModule>>,
}

impl SearchSpace {
    pub fn from_manifest(manifest: Manifest) -> Self {
        let mut space = Self { manifest, modules: BTreeMap::new() };
        space.refresh();
        space
    }

    /// Rebuild every candidate from the stored manifest. Factories that fail,
    /// or hand back a module for another stage, are left out.
    pub fn refresh(&mut self) {
        self.modules.clear();
        for entry in &self.manifest.entries {
            match (entry.factory)() {
                Ok(module) if module.stage() == entry.stage => {
                    self.modules.entry(entry.stage).or_default().push(module);
                }
                Ok(module) => {
                    warn!(
                        stage = %entry.stage,
                        candidate = %entry.label,
                        produced = %module.stage(),
                        "factory produced a module for the wrong stage; skipping"
                    );
                }
                Err(e) => {
                    warn!(stage = %entry.stage, candidate = %entry.label, error = %e, "candidate failed to load; skipping");
                }
            }
        }
        info!(counts = ?self.counts(), "search space loaded");
    }

    pub fn reload(&mut self, manifest: Manifest) {
        self.manifest = manifest;
        self.refresh();
    }

    pub fn clear(&mut self) { self.modules.clear(); }

    pub fn candidates(&self, stage: Stage) -> &[StageModule] {
        self.modules.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidate count for every stage, zeros included.
    pub fn counts(&self) -> BTreeMap<Stage, usize> {
        Stage::ALL.iter().map(|s| (*s, self.candidates(*s).len())).collect()
    }

    pub fn validate(&self) -> Result<()> {
        match Stage::ALL.iter().find(|s| self.candidates(**s).is_empty()) {
            Some(stage) => Err(Error::EmptyStage(*stage)),
            None => Ok(()),
        }
    }

    /// First registered candidate of every stage.
    pub fn default_configuration(&self) -> Result<PipelineConfiguration> {
        self.validate()?;
        let first = |stage: Stage| self.candidates(stage)[0].clone();
        PipelineConfiguration::from_modules(Stage::ALL.map(first))
    }
}
