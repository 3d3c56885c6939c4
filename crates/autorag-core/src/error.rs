use thiserror::Error;

use crate::types::Stage;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ground truth unusable ({path}): {reason}")]
    GroundTruth { path: String, reason: String },

    #[error("Stage '{0}' has no registered candidates")]
    EmptyStage(Stage),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
