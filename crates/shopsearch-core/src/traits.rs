use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;

/// Turns query text into a dense vector.
///
/// Implementations are long-lived and shared; `embed` may block (local model
/// inference), so async callers should run it on a blocking thread.
pub trait Embedder: Send + Sync {
    /// Stable model identifier, e.g. `sentence-transformers/all-MiniLM-L6-v2`.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// A document store that executes search request bodies against a named
/// collection and returns the raw response document.
///
/// The body is one of the four request shapes built by the orchestrator
/// (lexical, kNN, fused retrievers, fused-then-reranked). Parsing the
/// response into hits is the caller's job.
#[async_trait]
pub trait RetrievalBackend: Send + Sync {
    async fn search(&self, index: &str, body: &Value) -> Result<Value, BackendError>;
}
