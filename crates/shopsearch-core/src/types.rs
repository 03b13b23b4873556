//! Domain types shared by the orchestrator, the backends and the CLI.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::{EmbeddingError, SearchError};

/// Retrieval strategies, in increasing order of sophistication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Lexical,
    Vector,
    HybridFused,
    FullPipeline,
}

impl Strategy {
    /// Fixed order used by the comparison harness.
    pub const ALL: [Strategy; 4] = [Self::Lexical, Self::Vector, Self::HybridFused, Self::FullPipeline];

    pub fn label(self) -> &'static str {
        match self {
            Self::Lexical => "BM25 Keyword",
            Self::Vector => "Vector Semantic",
            Self::HybridFused => "Hybrid RRF",
            Self::FullPipeline => "Full Pipeline",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for Strategy {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "lexical" | "bm25" | "bm25-keyword" | "keyword" => Ok(Self::Lexical),
            "vector" | "semantic" | "vector-semantic" | "knn" => Ok(Self::Vector),
            "hybrid" | "hybrid-fused" | "hybrid-rrf" | "rrf" => Ok(Self::HybridFused),
            "full" | "full-pipeline" | "pipeline" | "rerank" => Ok(Self::FullPipeline),
            _ => Err(SearchError::InvalidRequest(format!("unknown strategy '{s}'"))),
        }
    }
}

/// A validated search request. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    k: usize,
    strategy: Strategy,
}

impl Query {
    /// Validate caller input: text must be non-empty after trimming and `k`
    /// must fall inside `bounds`.
    pub fn new(text: &str, k: usize, strategy: Strategy, bounds: &RangeInclusive<usize>) -> Result<Self, SearchError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SearchError::InvalidRequest("query is empty".to_string()));
        }
        if !bounds.contains(&k) {
            return Err(SearchError::InvalidRequest(format!(
                "k={k} is outside the allowed range {}..={}",
                bounds.start(),
                bounds.end()
            )));
        }
        Ok(Self { text: text.to_string(), k, strategy })
    }

    pub fn text(&self) -> &str { &self.text }
    pub fn k(&self) -> usize { self.k }
    pub fn strategy(&self) -> Strategy { self.strategy }
}

/// Dense query embedding. Produced fresh per query and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Accept `values` only if it has exactly `expected_dim` finite entries.
    pub fn checked(values: Vec<f32>, expected_dim: usize) -> Result<Self, EmbeddingError> {
        if values.len() != expected_dim {
            return Err(EmbeddingError::DimensionMismatch { expected: expected_dim, actual: values.len() });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFinite);
        }
        Ok(Self(values))
    }

    pub fn dim(&self) -> usize { self.0.len() }
    pub fn as_slice(&self) -> &[f32] { &self.0 }
}

/// A display field that may be missing upstream. Serializes as a string or
/// `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayValue {
    Available(String),
    NotAvailable,
}

impl DisplayValue {
    /// Empty, whitespace-only and `nan` values count as missing.
    pub fn from_text(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if !s.is_empty() && !s.eq_ignore_ascii_case("nan") => Self::Available(s.to_string()),
            _ => Self::NotAvailable,
        }
    }

    pub fn as_option(&self) -> Option<&str> {
        match self {
            Self::Available(s) => Some(s),
            Self::NotAvailable => None,
        }
    }
}

impl Serialize for DisplayValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { self.as_option().serialize(s) }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_option().unwrap_or("N/A")) }
}

/// One ranked product.
///
/// `score` is on the producing strategy's own scale and is not comparable
/// across strategies. `category` keeps its full text; truncation is a
/// rendering concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub name: String,
    pub brand: DisplayValue,
    pub price: f64,
    pub category: DisplayValue,
    pub image: DisplayValue,
}

/// Hits in backend rank order, tagged with the strategy that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResultSet {
    pub strategy: Strategy,
    pub hits: Vec<SearchHit>,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
}

impl RankedResultSet {
    pub fn len(&self) -> usize { self.hits.len() }
    pub fn is_empty(&self) -> bool { self.hits.is_empty() }
}

/// Serialize a duration as fractional milliseconds.
pub fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}
