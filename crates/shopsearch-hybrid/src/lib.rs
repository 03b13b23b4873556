//! shopsearch-hybrid
//!
//! Strategy orchestration: turns one product query into the request shape its
//! strategy needs (lexical, kNN, fused, fused-then-reranked), dispatches it,
//! and normalizes the backend's hits into a uniform ranked list. The
//! `ComparisonHarness` runs all four strategies side by side.

pub mod compare;
pub mod fusion;
pub mod normalize;
pub mod orchestrator;
pub mod request;

pub use compare::{ComparisonHarness, ComparisonReport, StrategyOutcome};
pub use orchestrator::SearchService;
pub use request::{CandidateRequest, RequestPlanner};
