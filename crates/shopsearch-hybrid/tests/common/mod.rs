#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use shopsearch_core::config::Settings;
use shopsearch_core::error::BackendError;
use shopsearch_core::traits::{Embedder, RetrievalBackend};
use shopsearch_hybrid::SearchService;

pub const DIM: usize = 8;

pub fn settings() -> Settings {
    let mut s = Settings::default();
    s.embedding.dimension = DIM;
    s
}

/// Embedder returning a fixed vector; can fail, stall, or return a wrong size.
#[derive(Default)]
pub struct StubEmbedder {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub stall: Option<Duration>,
    pub wrong_dim: bool,
}

impl Embedder for StubEmbedder {
    fn model_id(&self) -> &str { "stub" }
    fn dim(&self) -> usize { DIM }
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.stall { std::thread::sleep(d); }
        if self.fail { anyhow::bail!("model crashed"); }
        let len = if self.wrong_dim { DIM + 1 } else { DIM };
        Ok((0..len).map(|i| i as f32 / 10.0).collect())
    }
}

/// Request shape as seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape { Lexical, Knn, Rrf, Rerank }

pub fn shape_of(body: &Value) -> Shape {
    if body.get("query").is_some() { return Shape::Lexical; }
    if body.get("knn").is_some() { return Shape::Knn; }
    if body["retriever"].get("rrf").is_some() { return Shape::Rrf; }
    Shape::Rerank
}

/// Backend answering by request shape, recording every body it receives.
#[derive(Default)]
pub struct ScriptedBackend {
    pub responses: HashMap<Shape, Value>,
    pub failing: HashSet<Shape>,
    pub delays: HashMap<Shape, Duration>,
    pub requests: Mutex<Vec<(String, Value)>>,
}

impl ScriptedBackend {
    pub fn with_all(response: Value) -> Self {
        let responses = [Shape::Lexical, Shape::Knn, Shape::Rrf, Shape::Rerank].into_iter().map(|s| (s, response.clone())).collect();
        Self { responses, ..Self::default() }
    }

    pub fn requests(&self) -> Vec<(String, Value)> { self.requests.lock().expect("lock").clone() }
}

#[async_trait]
impl RetrievalBackend for ScriptedBackend {
    async fn search(&self, index: &str, body: &Value) -> Result<Value, BackendError> {
        self.requests.lock().expect("lock").push((index.to_string(), body.clone()));
        let shape = shape_of(body);
        if let Some(d) = self.delays.get(&shape) { tokio::time::sleep(*d).await; }
        if self.failing.contains(&shape) {
            return Err(BackendError::Transport(format!("{shape:?} outage")));
        }
        Ok(self.responses.get(&shape).cloned().unwrap_or_else(|| hits_response(&[])))
    }
}

/// `_search` response with full display fields.
pub fn hits_response(hits: &[(&str, f64)]) -> Value {
    let hits: Vec<Value> = hits
        .iter()
        .map(|(id, score)| {
            json!({
                "_id": id,
                "_score": score,
                "_source": {
                    "product_name": format!("Product {id}"),
                    "brand": "Mattel",
                    "price": 19.99,
                    "category": "Toys & Games | Vehicles",
                    "image_url": format!("https://img.example/{id}.jpg")
                }
            })
        })
        .collect();
    json!({ "took": 3, "hits": { "total": { "value": hits.len() }, "hits": hits } })
}

pub struct Doc {
    pub id: &'static str,
    pub product_name: &'static str,
    pub brand: &'static str,
    pub category: &'static str,
    pub document_text: &'static str,
}

/// Evaluates `multi_match` best_fields requests over an in-memory catalogue:
/// each field scores `boost * matched query terms`, the best field wins.
pub struct LexicalScoringBackend {
    pub docs: Vec<Doc>,
}

impl LexicalScoringBackend {
    fn field_text<'a>(doc: &'a Doc, field: &str) -> &'a str {
        match field {
            "product_name" => doc.product_name,
            "brand" => doc.brand,
            "category" => doc.category,
            _ => doc.document_text,
        }
    }
}

#[async_trait]
impl RetrievalBackend for LexicalScoringBackend {
    async fn search(&self, _index: &str, body: &Value) -> Result<Value, BackendError> {
        let mm = &body["query"]["multi_match"];
        let query = mm["query"].as_str().ok_or_else(|| BackendError::Malformed("no query".into()))?.to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();
        let fields: Vec<(String, f64)> = mm["fields"]
            .as_array()
            .ok_or_else(|| BackendError::Malformed("no fields".into()))?
            .iter()
            .filter_map(Value::as_str)
            .map(|f| match f.split_once('^') {
                Some((name, boost)) => (name.to_string(), boost.parse().unwrap_or(1.0)),
                None => (f.to_string(), 1.0),
            })
            .collect();
        let size = usize::try_from(body["size"].as_u64().unwrap_or(10)).unwrap_or(10);

        let mut scored: Vec<(&Doc, f64)> = self
            .docs
            .iter()
            .map(|doc| {
                let best = fields
                    .iter()
                    .map(|(field, boost)| {
                        let text = Self::field_text(doc, field).to_lowercase();
                        let words: HashSet<&str> = text.split_whitespace().collect();
                        boost * terms.iter().filter(|t| words.contains(*t)).count() as f64
                    })
                    .fold(0.0, f64::max);
                (doc, best)
            })
            .filter(|(_, s)| *s > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.id.cmp(b.0.id)));
        scored.truncate(size);

        let hits: Vec<Value> = scored
            .into_iter()
            .map(|(doc, score)| {
                json!({
                    "_id": doc.id,
                    "_score": score,
                    "_source": { "product_name": doc.product_name, "brand": doc.brand, "category": doc.category }
                })
            })
            .collect();
        Ok(json!({ "hits": { "hits": hits } }))
    }
}

pub fn service(embedder: Arc<StubEmbedder>, backend: Arc<dyn RetrievalBackend>) -> SearchService {
    service_with(settings(), embedder, backend)
}

pub fn service_with(settings: Settings, embedder: Arc<StubEmbedder>, backend: Arc<dyn RetrievalBackend>) -> SearchService {
    SearchService::new(settings, embedder, backend).expect("service")
}
