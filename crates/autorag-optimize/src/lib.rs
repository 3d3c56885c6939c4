//! autorag-optimize
//!
//! Candidate registry, pipeline execution, and the greedy stage-by-stage
//! search that picks one candidate per stage.

pub mod greedy;
pub mod metric;
pub mod pipeline;
pub mod registry;

pub use greedy::{GreedyOptimizer, OptimizationReport, Trial};
pub use metric::extract_metric;
pub use pipeline::{PipelineConfiguration, PipelineOutput, RunSettings};
pub use registry::{Manifest, SearchSpace, StageModule};
