//! Layered configuration.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys split on `__`), then validates the typed
//! `Settings` tree so window and boost invariants hold before any search runs.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Extract and validate the full typed settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchConfig,
    pub vector: VectorConfig,
    pub fusion: FusionConfig,
    pub rerank: RerankConfig,
    pub embedding: EmbeddingConfig,
    pub backend: BackendConfig,
    pub compare: CompareConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub index: String,
    pub min_k: usize,
    pub default_k: usize,
    pub max_k: usize,
    pub boosts: FieldBoosts,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { index: "amazon_2020_bbq".to_string(), min_k: 1, default_k: 5, max_k: 100, boosts: FieldBoosts::default() }
    }
}

impl SearchConfig {
    pub fn k_range(&self) -> RangeInclusive<usize> { self.min_k..=self.max_k }
}

/// Relative weights of the lexically scored fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldBoosts {
    pub product_name: f32,
    pub brand: f32,
    pub category: f32,
    pub document_text: f32,
}

impl Default for FieldBoosts {
    fn default() -> Self { Self { product_name: 3.0, brand: 2.0, category: 1.5, document_text: 1.0 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub candidate_multiplier: usize,
    pub candidate_ceiling: usize,
    /// Neighbours requested by the kNN sub-retriever of the fused strategies.
    pub hybrid_k: usize,
}

impl Default for VectorConfig {
    fn default() -> Self { Self { candidate_multiplier: 10, candidate_ceiling: 1000, hybrid_k: 50 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMode {
    /// One request; the backend runs its `rrf` retriever.
    Backend,
    /// Two sub-requests fused locally.
    Client,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub mode: FusionMode,
    pub window: usize,
    /// Unset leaves the backend's own default (60) in charge.
    pub rank_constant: Option<u32>,
}

impl Default for FusionConfig {
    fn default() -> Self { Self { mode: FusionMode::Backend, window: 100, rank_constant: None } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub inference_id: String,
    pub field: String,
    pub window: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self { inference_id: "jina_reranker_v3".to_string(), field: "document_text".to_string(), window: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub max_len: usize,
    pub timeout_ms: u64,
    pub model_dir: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            max_len: 256,
            timeout_ms: 10_000,
            model_dir: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
    pub fn model_dir(&self) -> Option<PathBuf> { self.model_dir.as_deref().map(expand_path) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_ms: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { url: "http://localhost:9200".to_string(), timeout_ms: 10_000, username: None, password: None, api_key: None }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub concurrent: bool,
}

impl Default for CompareConfig {
    fn default() -> Self { Self { concurrent: true } }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let s = &self.search;
        if s.index.trim().is_empty() {
            return invalid("search.index must not be empty");
        }
        if !(1 <= s.min_k && s.min_k <= s.default_k && s.default_k <= s.max_k) {
            return invalid(format!(
                "expected 1 <= min_k <= default_k <= max_k, got {} / {} / {}",
                s.min_k, s.default_k, s.max_k
            ));
        }
        let b = &s.boosts;
        if !(b.product_name > b.brand && b.brand > b.category && b.category > b.document_text && b.document_text > 0.0) {
            return invalid(format!(
                "boosts must be positive and ordered product_name > brand > category > document_text, got {b:?}"
            ));
        }
        if self.vector.candidate_multiplier < 2 {
            return invalid("vector.candidate_multiplier must be at least 2");
        }
        if self.vector.candidate_ceiling <= s.max_k {
            return invalid(format!(
                "vector.candidate_ceiling ({}) must exceed search.max_k ({})",
                self.vector.candidate_ceiling, s.max_k
            ));
        }
        if self.vector.hybrid_k == 0 {
            return invalid("vector.hybrid_k must be positive");
        }
        if self.fusion.window < s.max_k {
            return invalid(format!("fusion.window ({}) must be >= search.max_k ({})", self.fusion.window, s.max_k));
        }
        if self.fusion.rank_constant == Some(0) {
            return invalid("fusion.rank_constant must be at least 1 when set");
        }
        if self.rerank.window == 0 || self.rerank.window > self.fusion.window {
            return invalid(format!(
                "rerank.window ({}) must be in 1..=fusion.window ({})",
                self.rerank.window, self.fusion.window
            ));
        }
        if self.rerank.inference_id.trim().is_empty() || self.rerank.field.trim().is_empty() {
            return invalid("rerank.inference_id and rerank.field must be set");
        }
        if self.embedding.dimension == 0 {
            return invalid("embedding.dimension must be positive");
        }
        if self.embedding.timeout_ms == 0 || self.backend.timeout_ms == 0 {
            return invalid("timeouts must be non-zero");
        }
        if self.backend.url.trim().is_empty() {
            return invalid("backend.url must not be empty");
        }
        Ok(())
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T> { Err(Error::InvalidConfig(msg.into())) }

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
