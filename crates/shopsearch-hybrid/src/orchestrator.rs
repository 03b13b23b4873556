use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use shopsearch_core::config::{FusionMode, Settings};
use shopsearch_core::error::{BackendError, EmbeddingError, Error};
use shopsearch_core::traits::{Embedder, RetrievalBackend};
use shopsearch_core::{EmbeddingVector, Query, RankedResultSet, SearchError, SearchHit, Strategy};

use crate::fusion::{reciprocal_rank_fusion, DEFAULT_RANK_CONSTANT};
use crate::normalize::parse_hits;
use crate::request::{CandidateRequest, RequestPlanner};

/// The Strategy Orchestrator.
///
/// Holds no per-query state. The embedder and the backend are long-lived
/// handles built once at startup and shared by every call; cloning the
/// service clones the handles, not the collaborators.
#[derive(Clone)]
pub struct SearchService {
    settings: Arc<Settings>,
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn RetrievalBackend>,
}

impl SearchService {
    pub fn new(settings: Settings, embedder: Arc<dyn Embedder>, backend: Arc<dyn RetrievalBackend>) -> Result<Self, Error> {
        settings.validate()?;
        if embedder.dim() != settings.embedding.dimension {
            return Err(Error::InvalidConfig(format!(
                "embedder {} produces {} dimensions, embedding.dimension is {}",
                embedder.model_id(),
                embedder.dim(),
                settings.embedding.dimension
            )));
        }
        Ok(Self { settings: Arc::new(settings), embedder, backend })
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn planner(&self) -> RequestPlanner<'_> { RequestPlanner::new(&self.settings) }

    /// Validate caller input, falling back to `search.default_k` when `k` is
    /// not given.
    pub fn query(&self, text: &str, k: Option<usize>, strategy: Strategy) -> Result<Query, SearchError> {
        let k = k.unwrap_or(self.settings.search.default_k);
        Query::new(text, k, strategy, &self.settings.search.k_range())
    }

    pub async fn search(&self, text: &str, k: usize, strategy: Strategy) -> Result<RankedResultSet, SearchError> {
        let query = self.query(text, Some(k), strategy)?;
        self.execute(&query).await
    }

    /// Run one validated query. Embedding (when the strategy needs one) and
    /// the backend call happen strictly in sequence.
    ///
    /// `k` is checked against this service's configured bounds whatever
    /// bounds the `Query` was built with.
    #[tracing::instrument(name = "search", skip_all, fields(strategy = %query.strategy(), k = query.k()))]
    pub async fn execute(&self, query: &Query) -> Result<RankedResultSet, SearchError> {
        let start = Instant::now();
        let k = query.k();
        let bounds = self.settings.search.k_range();
        if !bounds.contains(&k) {
            return Err(SearchError::InvalidRequest(format!(
                "k={k} is outside the allowed range {}..={}",
                bounds.start(),
                bounds.end()
            )));
        }
        let planner = self.planner();

        let hits = match query.strategy() {
            Strategy::Lexical => self.dispatch(&planner.lexical_request(query), k).await?,
            Strategy::Vector => {
                let vector = self.embed(query.text()).await?;
                self.dispatch(&planner.vector_request(query, vector), k).await?
            }
            Strategy::HybridFused => {
                let vector = self.embed(query.text()).await?;
                match self.settings.fusion.mode {
                    FusionMode::Backend => self.dispatch(&planner.hybrid_request(query, vector), k).await?,
                    FusionMode::Client => self.fuse_client_side(query, vector).await?,
                }
            }
            Strategy::FullPipeline => {
                let vector = self.embed(query.text()).await?;
                self.dispatch(&planner.full_pipeline_request(query, vector), k).await?
            }
        };

        let hits = cap_to_k(hits, k);
        let latency = start.elapsed();
        info!(hits = hits.len(), latency_ms = latency.as_millis() as u64, "search complete");
        Ok(RankedResultSet { strategy: query.strategy(), hits, latency })
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let timeout = self.settings.embedding.timeout();
        let embedder = Arc::clone(&self.embedder);
        let text = text.to_string();
        let task = tokio::task::spawn_blocking(move || embedder.embed(&text));
        let values = match tokio::time::timeout(timeout, task).await {
            Err(_) => return Err(EmbeddingError::Timeout(timeout)),
            Ok(Err(join)) => return Err(EmbeddingError::Provider(format!("embedding task failed: {join}"))),
            Ok(Ok(result)) => result.map_err(|e| EmbeddingError::Provider(format!("{e:#}")))?,
        };
        let vector = EmbeddingVector::checked(values, self.settings.embedding.dimension)?;
        debug!(model = self.embedder.model_id(), dim = vector.dim(), "query embedded");
        Ok(vector)
    }

    async fn dispatch(&self, request: &CandidateRequest, size: usize) -> Result<Vec<SearchHit>, BackendError> {
        let timeout: Duration = self.settings.backend.timeout();
        let body = request.to_body(size);
        debug!(shape = ?request.strategy(), size, "dispatching backend request");
        let response = tokio::time::timeout(timeout, self.backend.search(&self.settings.search.index, &body))
            .await
            .map_err(|_| BackendError::Timeout(timeout))??;
        parse_hits(response)
    }

    async fn fuse_client_side(&self, query: &Query, vector: EmbeddingVector) -> Result<Vec<SearchHit>, BackendError> {
        let (lexical, knn, window) = self.planner().client_fusion_requests(query, vector);
        let (lexical_hits, knn_hits) = tokio::join!(self.dispatch(&lexical, window), self.dispatch(&knn, window));
        let lists = [lexical_hits?, knn_hits?];
        let rank_constant = self.settings.fusion.rank_constant.unwrap_or(DEFAULT_RANK_CONSTANT);
        debug!(lexical = lists[0].len(), knn = lists[1].len(), rank_constant, "fusing client-side");
        Ok(reciprocal_rank_fusion(&lists, rank_constant, query.k()))
    }
}

/// Keep backend order; drop anything past `k`.
fn cap_to_k(mut hits: Vec<SearchHit>, k: usize) -> Vec<SearchHit> {
    if hits.len() > k {
        warn!(returned = hits.len(), k, "backend returned more hits than requested; truncating");
        hits.truncate(k);
    }
    hits
}
