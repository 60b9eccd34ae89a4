//! Error types for the optimizer pipeline and its collaborators

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by data sources and recommendation sinks
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed inventory data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Errors raised inside pipeline stages
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data source error: {0}")]
    Source(#[from] SourceError),

    #[error("resource {0} is not part of the ingested inventory")]
    MissingResource(String),

    #[error("resource id {0} appears more than once in the inventory")]
    DuplicateResource(String),

    #[error("no features were extracted for resource {0}")]
    MissingFeatures(String),

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("stage {stage} failed: {reason}")]
    StageFailed { stage: String, reason: String },
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
