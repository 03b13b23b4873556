//! Shared vocabulary for the product search workspace.
//!
//! Holds the query/result types, the error taxonomy, the two collaborator
//! traits the orchestrator is written against, and the layered configuration.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{BackendError, EmbeddingError, PartialComparisonFailure, SearchError, StrategyFailure};
pub use types::{DisplayValue, EmbeddingVector, Query, RankedResultSet, SearchHit, Strategy};
