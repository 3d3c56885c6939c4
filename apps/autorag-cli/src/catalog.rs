//! Name to factory lookup for every built-in stage candidate.

use std::sync::Arc;

use anyhow::anyhow;
use autorag_core::config::{FusionSettings, SearchSpaceSettings};
use autorag_core::traits::DenseSearch;
use autorag_core::types::Stage;
use autorag_hybrid::HybridDbsfRetriever;
use autorag_modules::{
    ChatModel, DynamicPrompt, FStringPrompt, FlagLlmReranker, HydeExpander, LlmGenerator, LongContextPrompt, NeighborMode,
    NoAugment, PassExpander, PassReranker, PrevNextAugment,
};
use autorag_optimize::registry::Factory;
use autorag_optimize::{Manifest, StageModule};
use autorag_text::{Bm25Index, Bm25Retriever};

/// Shared handles the factories draw on. The chat model is optional: when it
/// could not be built, LLM-backed candidates fail to load and are skipped.
#[derive(Clone)]
pub struct Resources {
    pub sparse: Arc<Bm25Index>,
    pub dense: Arc<dyn DenseSearch>,
    pub fusion: FusionSettings,
    pub llm: Result<Arc<dyn ChatModel>, String>,
}

impl Resources {
    fn chat(&self) -> anyhow::Result<Arc<dyn ChatModel>> {
        self.llm.clone().map_err(|e| anyhow!("chat model unavailable: {}", e))
    }
}

/// Build the manifest for the configured candidate names, in configured order.
pub fn build_manifest(names: &SearchSpaceSettings, resources: &Resources) -> Manifest {
    let mut manifest = Manifest::new();
    for stage in Stage::ALL {
        for name in names.names(stage) {
            match factory(stage, name, resources) {
                Some(f) => {
                    manifest.register(stage, name.clone(), f);
                }
                None => tracing::warn!(%stage, candidate = %name, "unknown candidate name; skipping"),
            }
        }
    }
    manifest
}

fn factory(stage: Stage, name: &str, res: &Resources) -> Option<Factory> {
    let res = res.clone();
    let f: Factory = match (stage, name) {
        (Stage::QueryExpansion, "pass") => Box::new(|| Ok(StageModule::QueryExpansion(Arc::new(PassExpander)))),
        (Stage::QueryExpansion, "hyde") => {
            Box::new(move || Ok(StageModule::QueryExpansion(Arc::new(HydeExpander::new(res.chat()?)))))
        }
        (Stage::Retrieval, "bm25") => {
            Box::new(move || Ok(StageModule::Retrieval(Arc::new(Bm25Retriever::new(res.sparse.clone())))))
        }
        (Stage::Retrieval, "hybrid_dbsf") => Box::new(move || {
            let retriever = HybridDbsfRetriever::new(
                res.sparse.clone(),
                res.dense.clone(),
                res.fusion.alpha,
                res.fusion.dense_candidates,
            )?;
            Ok(StageModule::Retrieval(Arc::new(retriever)))
        }),
        (Stage::Augmentation, "pass") => Box::new(|| Ok(StageModule::Augmentation(Arc::new(NoAugment)))),
        (Stage::Augmentation, n) if n == "prev_next" || n.starts_with("prev_next:") => {
            let mode = n.strip_prefix("prev_next:").unwrap_or("both").to_string();
            Box::new(move || {
                let mode: NeighborMode = mode.parse()?;
                Ok(StageModule::Augmentation(Arc::new(PrevNextAugment::new(mode))))
            })
        }
        (Stage::Reranker, "pass") => Box::new(|| Ok(StageModule::Reranker(Arc::new(PassReranker)))),
        (Stage::Reranker, "flag_llm") => {
            Box::new(move || Ok(StageModule::Reranker(Arc::new(FlagLlmReranker::new(res.chat()?)))))
        }
        (Stage::PromptMaker, "f_string") => Box::new(|| Ok(StageModule::PromptMaker(Arc::new(FStringPrompt)))),
        (Stage::PromptMaker, "long_context_reorder") => {
            Box::new(|| Ok(StageModule::PromptMaker(Arc::new(LongContextPrompt))))
        }
        (Stage::PromptMaker, "dynamic_llm") => {
            Box::new(move || Ok(StageModule::PromptMaker(Arc::new(DynamicPrompt::new(res.chat()?)))))
        }
        (Stage::Generator, "llm") => {
            Box::new(move || Ok(StageModule::Generator(Arc::new(LlmGenerator::new(res.chat()?)))))
        }
        _ => return None,
    };
    Some(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autorag_core::types::Chunk;
    use autorag_optimize::SearchSpace;

    struct NoDense;

    impl DenseSearch for NoDense {
        fn similarity_search(&self, _query: &str, _k: usize) -> anyhow::Result<Vec<Chunk>> { Ok(vec![]) }
    }

    struct Echo;

    impl ChatModel for Echo {
        fn complete(&self, messages: &[autorag_modules::ChatMessage]) -> anyhow::Result<String> {
            Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
        }
    }

    fn resources(llm: Result<Arc<dyn ChatModel>, String>) -> Resources {
        let sparse = Bm25Index::build_in_ram(&[Chunk::new("water boils at sea level", "doc").with_id("doc:0")]).expect("bm25");
        Resources { sparse: Arc::new(sparse), dense: Arc::new(NoDense), fusion: FusionSettings::default(), llm }
    }

    fn names(space: &SearchSpace, stage: Stage) -> Vec<String> {
        space.candidates(stage).iter().map(|m| m.name().to_string()).collect()
    }

    #[test]
    fn default_names_all_resolve_with_a_chat_model() {
        let manifest = build_manifest(&SearchSpaceSettings::default(), &resources(Ok(Arc::new(Echo))));
        assert_eq!(manifest.len(), 12);
        let space = SearchSpace::from_manifest(manifest);
        assert_eq!(names(&space, Stage::Retrieval), vec!["bm25", "hybrid_dbsf"]);
        assert_eq!(names(&space, Stage::PromptMaker), vec!["f_string", "long_context_reorder", "dynamic_llm"]);
        assert!(space.validate().is_ok());
    }

    #[test]
    fn llm_candidates_drop_out_without_a_chat_model() {
        let space = SearchSpace::from_manifest(build_manifest(
            &SearchSpaceSettings::default(),
            &resources(Err("no key".to_string())),
        ));
        assert_eq!(names(&space, Stage::QueryExpansion), vec!["pass"]);
        assert_eq!(names(&space, Stage::Reranker), vec!["pass"]);
        assert!(space.candidates(Stage::Generator).is_empty());
        assert!(space.validate().is_err());
    }

    #[test]
    fn unknown_names_are_skipped_and_modes_parse() {
        let mut settings = SearchSpaceSettings::default();
        settings.retrieval = vec!["bm25".into(), "colbert".into()];
        settings.augmentation = vec!["prev_next:prev".into(), "prev_next:sideways".into()];
        let manifest = build_manifest(&settings, &resources(Ok(Arc::new(Echo))));
        let labels: Vec<String> = manifest.labels().iter().map(|(_, l)| l.to_string()).collect();
        assert!(!labels.contains(&"colbert".to_string()));

        let space = SearchSpace::from_manifest(manifest);
        assert_eq!(names(&space, Stage::Retrieval), vec!["bm25"]);
        assert_eq!(names(&space, Stage::Augmentation), vec!["prev_next"]);
    }

    #[test]
    fn bad_fusion_alpha_excludes_hybrid() {
        let mut res = resources(Ok(Arc::new(Echo)));
        res.fusion.alpha = 2.0;
        let space = SearchSpace::from_manifest(build_manifest(&SearchSpaceSettings::default(), &res));
        assert_eq!(names(&space, Stage::Retrieval), vec!["bm25"]);
    }
}
