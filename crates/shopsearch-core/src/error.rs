use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::types::Strategy;

/// Setup failures: configuration and client construction.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The Embedding Provider failed or produced an unusable vector.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider failed: {0}")]
    Provider(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding contains non-finite values")]
    NonFinite,

    #[error("embedding timed out after {0:?}")]
    Timeout(Duration),
}

/// The Retrieval Backend failed, timed out, or answered with something that
/// is not a hit list.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    Malformed(String),

    #[error("backend returned a partial result: {0}")]
    Partial(String),
}

/// Failure of a single `search` call.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SearchError {
    /// Whether repeating the same call could plausibly succeed.
    ///
    /// Nothing retries today; callers that add a retry layer key off this.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidRequest(_) => false,
            Self::Embedding(e) => matches!(e, EmbeddingError::Timeout(_) | EmbeddingError::Provider(_)),
            Self::Backend(e) => match e {
                BackendError::Transport(_) | BackendError::Timeout(_) | BackendError::Partial(_) => true,
                BackendError::Status { status, .. } => *status >= 500,
                BackendError::Malformed(_) => false,
            },
        }
    }

    /// Short machine-readable tag, used by the CLI and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Embedding(_) => "embedding_error",
            Self::Backend(_) => "backend_error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyFailure {
    pub strategy: Strategy,
    pub kind: &'static str,
    pub reason: String,
}

/// Some strategies in a comparison run failed while the rest completed.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{} of {total} strategies failed: {}", failures.len(), describe(failures))]
pub struct PartialComparisonFailure {
    pub failures: Vec<StrategyFailure>,
    pub total: usize,
}

fn describe(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.strategy, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}
