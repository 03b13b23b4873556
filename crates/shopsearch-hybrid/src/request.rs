//! Request builders for the four retrieval strategies.
//!
//! The lexical clause and the kNN clause are the two building blocks; the
//! fused retriever composes both, and the reranking retriever wraps the fused
//! one. `RequestPlanner` owns the window arithmetic so every strategy sizes its
//! candidate pools the same way.

use serde_json::{json, Value};

use shopsearch_core::config::{FieldBoosts, Settings};
use shopsearch_core::{EmbeddingVector, Query, Strategy};

pub const PRODUCT_NAME: &str = "product_name";
pub const BRAND: &str = "brand";
pub const CATEGORY: &str = "category";
pub const DOCUMENT_TEXT: &str = "document_text";
pub const PRICE: &str = "price";
pub const IMAGE_URL: &str = "image_url";
pub const EMBEDDING: &str = "embedding";

/// Display projection. The embedding and the free text are never fetched.
pub const SOURCE_FIELDS: [&str; 5] = [PRODUCT_NAME, BRAND, PRICE, CATEGORY, IMAGE_URL];

/// Multi-field keyword match, best single field wins.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalClause {
    pub query: String,
    pub boosts: FieldBoosts,
}

impl LexicalClause {
    /// `field^boost` entries, highest weight first.
    pub fn boosted_fields(&self) -> Vec<String> {
        let b = &self.boosts;
        vec![
            format!("{PRODUCT_NAME}^{}", b.product_name),
            format!("{BRAND}^{}", b.brand),
            format!("{CATEGORY}^{}", b.category),
            format!("{DOCUMENT_TEXT}^{}", b.document_text),
        ]
    }

    pub fn to_query(&self) -> Value {
        json!({
            "multi_match": {
                "query": self.query,
                "fields": self.boosted_fields(),
                "type": "best_fields"
            }
        })
    }
}

/// Approximate nearest-neighbour search over the document embedding field.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnClause {
    pub vector: EmbeddingVector,
    pub k: usize,
    pub num_candidates: usize,
}

impl KnnClause {
    pub fn to_json(&self) -> Value {
        json!({
            "field": EMBEDDING,
            "query_vector": self.vector.as_slice(),
            "k": self.k,
            "num_candidates": self.num_candidates
        })
    }
}

/// Reciprocal rank fusion of the lexical and kNN retrievers.
#[derive(Debug, Clone, PartialEq)]
pub struct RrfRetriever {
    pub lexical: LexicalClause,
    pub knn: KnnClause,
    pub rank_window_size: usize,
    pub rank_constant: Option<u32>,
}

impl RrfRetriever {
    pub fn to_retriever(&self) -> Value {
        let mut rrf = json!({
            "retrievers": [
                { "standard": { "query": self.lexical.to_query() } },
                { "knn": self.knn.to_json() }
            ],
            "rank_window_size": self.rank_window_size
        });
        if let Some(c) = self.rank_constant {
            rrf["rank_constant"] = json!(c);
        }
        json!({ "rrf": rrf })
    }
}

/// Cross-encoder reranking over the top of a fused candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankRetriever {
    pub fused: RrfRetriever,
    pub field: String,
    pub inference_id: String,
    pub inference_text: String,
    pub rank_window_size: usize,
}

impl RerankRetriever {
    pub fn to_retriever(&self) -> Value {
        json!({
            "text_similarity_reranker": {
                "retriever": self.fused.to_retriever(),
                "field": self.field,
                "inference_id": self.inference_id,
                "inference_text": self.inference_text,
                "rank_window_size": self.rank_window_size
            }
        })
    }
}

/// The backend payload for one strategy. Built per call, dropped after dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateRequest {
    Lexical(LexicalClause),
    Vector(KnnClause),
    HybridFused(RrfRetriever),
    FullPipeline(RerankRetriever),
}

impl CandidateRequest {
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Lexical(_) => Strategy::Lexical,
            Self::Vector(_) => Strategy::Vector,
            Self::HybridFused(_) => Strategy::HybridFused,
            Self::FullPipeline(_) => Strategy::FullPipeline,
        }
    }

    /// Full `_search` body returning at most `size` hits.
    pub fn to_body(&self, size: usize) -> Value {
        let (key, value) = match self {
            Self::Lexical(lex) => ("query", lex.to_query()),
            Self::Vector(knn) => ("knn", knn.to_json()),
            Self::HybridFused(rrf) => ("retriever", rrf.to_retriever()),
            Self::FullPipeline(rerank) => ("retriever", rerank.to_retriever()),
        };
        let mut body = json!({ "size": size, "_source": SOURCE_FIELDS });
        body[key] = value;
        body
    }
}

/// Window sizing and request construction from validated settings.
#[derive(Debug, Clone, Copy)]
pub struct RequestPlanner<'a> {
    settings: &'a Settings,
}

impl<'a> RequestPlanner<'a> {
    pub fn new(settings: &'a Settings) -> Self { Self { settings } }

    /// kNN candidate pool for `k` neighbours: `k * multiplier`, capped at the
    /// ceiling, never below `k + 1`.
    pub fn candidate_pool(&self, k: usize) -> usize {
        let v = &self.settings.vector;
        k.saturating_mul(v.candidate_multiplier).min(v.candidate_ceiling).max(k + 1)
    }

    pub fn fusion_window(&self, k: usize) -> usize { self.settings.fusion.window.max(k) }

    /// Never below `k`, never above the fusion window feeding it.
    pub fn rerank_window(&self, k: usize) -> usize { self.settings.rerank.window.max(k).min(self.fusion_window(k)) }

    /// Neighbours requested by the kNN leg of the fused strategies.
    pub fn hybrid_knn_k(&self, k: usize) -> usize { self.settings.vector.hybrid_k.max(k) }

    pub fn lexical_clause(&self, query: &Query) -> LexicalClause {
        LexicalClause { query: query.text().to_string(), boosts: self.settings.search.boosts }
    }

    pub fn knn_clause(&self, vector: EmbeddingVector, k: usize) -> KnnClause {
        KnnClause { vector, k, num_candidates: self.candidate_pool(k) }
    }

    pub fn lexical_request(&self, query: &Query) -> CandidateRequest { CandidateRequest::Lexical(self.lexical_clause(query)) }

    pub fn vector_request(&self, query: &Query, vector: EmbeddingVector) -> CandidateRequest {
        CandidateRequest::Vector(self.knn_clause(vector, query.k()))
    }

    fn rrf(&self, query: &Query, vector: EmbeddingVector) -> RrfRetriever {
        RrfRetriever {
            lexical: self.lexical_clause(query),
            knn: self.knn_clause(vector, self.hybrid_knn_k(query.k())),
            rank_window_size: self.fusion_window(query.k()),
            rank_constant: self.settings.fusion.rank_constant,
        }
    }

    pub fn hybrid_request(&self, query: &Query, vector: EmbeddingVector) -> CandidateRequest {
        CandidateRequest::HybridFused(self.rrf(query, vector))
    }

    pub fn full_pipeline_request(&self, query: &Query, vector: EmbeddingVector) -> CandidateRequest {
        let rerank = &self.settings.rerank;
        CandidateRequest::FullPipeline(RerankRetriever {
            fused: self.rrf(query, vector),
            field: rerank.field.clone(),
            inference_id: rerank.inference_id.clone(),
            inference_text: query.text().to_string(),
            rank_window_size: self.rerank_window(query.k()),
        })
    }

    /// The two independent legs used when fusion runs client-side, each
    /// sized to the fusion window. Returns `(lexical, knn, window)`.
    pub fn client_fusion_requests(&self, query: &Query, vector: EmbeddingVector) -> (CandidateRequest, CandidateRequest, usize) {
        let window = self.fusion_window(query.k());
        let lexical = self.lexical_request(query);
        let knn = CandidateRequest::Vector(self.knn_clause(vector, window));
        (lexical, knn, window)
    }
}
