use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use tracing::warn;

use shopsearch_core::types::serialize_millis;
use shopsearch_core::{PartialComparisonFailure, Query, RankedResultSet, SearchError, Strategy, StrategyFailure};

use crate::orchestrator::SearchService;

/// Result of one strategy inside a comparison run.
#[derive(Debug)]
pub struct StrategyOutcome {
    pub strategy: Strategy,
    /// Wall clock from dispatch to return, embedding round trip included.
    pub latency: Duration,
    pub result: Result<RankedResultSet, SearchError>,
}

impl Serialize for StrategyOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Millis(Duration);
        impl Serialize for Millis {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { serialize_millis(&self.0, s) }
        }
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            kind: &'static str,
            reason: &'a str,
        }

        let mut state = serializer.serialize_struct("StrategyOutcome", 3)?;
        state.serialize_field("strategy", &self.strategy)?;
        state.serialize_field("latency_ms", &Millis(self.latency))?;
        match &self.result {
            Ok(set) => state.serialize_field("hits", &set.hits)?,
            Err(e) => state.serialize_field("error", &ErrorBody { kind: e.kind(), reason: &e.to_string() })?,
        }
        state.end()
    }
}

/// One outcome per strategy, always in `Strategy::ALL` order.
#[derive(Debug, Serialize)]
pub struct ComparisonReport {
    pub query: String,
    pub k: usize,
    pub outcomes: Vec<StrategyOutcome>,
}

impl ComparisonReport {
    pub fn get(&self, strategy: Strategy) -> Option<&StrategyOutcome> { self.outcomes.iter().find(|o| o.strategy == strategy) }

    pub fn successes(&self) -> impl Iterator<Item = &RankedResultSet> { self.outcomes.iter().filter_map(|o| o.result.as_ref().ok()) }

    pub fn is_complete(&self) -> bool { self.outcomes.iter().all(|o| o.result.is_ok()) }

    /// `Some` when at least one strategy failed; names each failure.
    pub fn partial_failure(&self) -> Option<PartialComparisonFailure> {
        let failures: Vec<StrategyFailure> = self
            .outcomes
            .iter()
            .filter_map(|o| {
                o.result.as_ref().err().map(|e| StrategyFailure { strategy: o.strategy, kind: e.kind(), reason: e.to_string() })
            })
            .collect();
        if failures.is_empty() { None } else { Some(PartialComparisonFailure { failures, total: self.outcomes.len() }) }
    }
}

/// Runs every strategy against the same query for side-by-side evaluation.
///
/// A failing strategy never aborts or hides the others: its error is kept in
/// its own outcome slot.
#[derive(Clone)]
pub struct ComparisonHarness {
    service: SearchService,
    concurrent: bool,
}

impl ComparisonHarness {
    pub fn new(service: SearchService) -> Self {
        let concurrent = service.settings().compare.concurrent;
        Self { service, concurrent }
    }

    pub fn with_concurrency(mut self, concurrent: bool) -> Self { self.concurrent = concurrent; self }

    /// Invalid input fails once up front; everything after that is reported
    /// per strategy.
    pub async fn compare_all(&self, text: &str, k: usize) -> Result<ComparisonReport, SearchError> {
        let queries = Strategy::ALL
            .iter()
            .map(|&strategy| self.service.query(text, Some(k), strategy))
            .collect::<Result<Vec<_>, _>>()?;

        let outcomes = if self.concurrent {
            join_all(queries.iter().map(|q| self.run_timed(q))).await
        } else {
            let mut outcomes = Vec::with_capacity(queries.len());
            for q in &queries {
                outcomes.push(self.run_timed(q).await);
            }
            outcomes
        };

        let query = queries.first().map(|q| q.text().to_string()).unwrap_or_default();
        Ok(ComparisonReport { query, k, outcomes })
    }

    async fn run_timed(&self, query: &Query) -> StrategyOutcome {
        let start = Instant::now();
        let result = self.service.execute(query).await;
        let latency = start.elapsed();
        if let Err(e) = &result {
            warn!(strategy = %query.strategy(), error = %e, "strategy failed during comparison");
        }
        StrategyOutcome { strategy: query.strategy(), latency, result }
    }
}
