//! Embedding Provider implementations.
//!
//! `SentenceEmbedder` runs a BERT sentence encoder (all-MiniLM-L6-v2 by
//! default) locally through candle, mean pooled and L2 normalized.
//! `FakeEmbedder` hashes tokens into a fixed-size vector and is selected with
//! `APP_USE_FAKE_EMBEDDINGS=1` for tests and offline development.

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;

use shopsearch_core::config::EmbeddingConfig;
use shopsearch_core::traits::Embedder;

pub struct SentenceEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, model_id: String, dim: usize, max_len: usize }

impl SentenceEmbedder {
    pub fn load(config: &EmbeddingConfig) -> Result<Self> {
        let device = device::select_device();
        let model_dir = resolve_model_dir(config)?;
        tracing::info!(model = %config.model, dir = %model_dir.display(), "loading sentence encoder");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let bert_config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let vb = load_weights(&model_dir, &device)?;
        let model = BertModel::load(vb, &bert_config)?;
        tracing::info!(model = %config.model, "sentence encoder loaded");
        Ok(Self { model, tokenizer, device, model_id: config.model.clone(), dim: config.dimension, max_len: config.max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 { tracing::warn!(?elapsed, "slow embedding"); }
        Ok(emb)
    }
}

impl Embedder for SentenceEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn embed(&self, text: &str) -> Result<Vec<f32>> { self.embed_text(text) }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while mapped.
        return Ok(unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DTYPE, device)? });
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)?;
    let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DTYPE, device))
}

/// Deterministic stand-in: hashes whitespace tokens into buckets.
pub struct FakeEmbedder { dim: usize, id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("fake:xxh64:d{dim}") } }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = usize::try_from(h % self.dim as u64)?;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6); for x in &mut v { *x /= norm; } Ok(v)
    }
}

pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake { tracing::info!(dim = config.dimension, "using FakeEmbedder"); return Ok(Arc::new(FakeEmbedder::new(config.dimension))); }
    Ok(Arc::new(SentenceEmbedder::load(config)?))
}

/// Locate the model directory (must hold `tokenizer.json` and `config.json`).
///
/// An explicitly configured `embedding.model_dir` wins and is not second
/// guessed. Otherwise `APP_MODEL_DIR`, `MODEL_DIR`, then `../models/<name>`
/// and `models/<name>` are tried, where `<name>` is the last segment of the
/// model id.
pub fn resolve_model_dir(config: &EmbeddingConfig) -> Result<PathBuf> {
    if let Some(dir) = config.model_dir() {
        if is_model_dir(&dir) { return Ok(dir); }
        return Err(anyhow!("Configured model_dir {} has no tokenizer.json/config.json", dir.display()));
    }
    let name = config.model.rsplit('/').next().unwrap_or(&config.model);
    let candidates = ["APP_MODEL_DIR", "MODEL_DIR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok().map(PathBuf::from))
        .chain([Path::new("../models").join(name), Path::new("models").join(name)]);
    for dir in candidates {
        if is_model_dir(&dir) { tracing::debug!(dir = %dir.display(), "using model dir"); return Ok(dir); }
    }
    Err(anyhow!("Could not locate model directory for {}", config.model))
}

fn is_model_dir(dir: &Path) -> bool { dir.join("tokenizer.json").is_file() && dir.join("config.json").is_file() }
