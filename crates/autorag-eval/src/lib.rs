//! Evaluators that turn a batch of pipeline predictions into a metric map.

pub mod http;
pub mod reference;

pub use http::HttpEvaluator;
pub use reference::{ReferenceContextEvaluator, ANSWER_OVERLAP, CONTEXT_PRECISION};
