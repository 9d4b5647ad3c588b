use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use courtside_core::error::ProviderError;
use courtside_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

const PROVIDER: &str = "bge-m3";
const MAX_LEN: usize = 256;

struct LoadedModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl LoadedModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let v: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if v.len() != self.dim {
            return Err(anyhow!("model produced {} dims, expected {}", v.len(), self.dim));
        }
        let elapsed = start.elapsed().as_millis();
        if elapsed > 100 {
            warn!(elapsed_ms = elapsed as u64, "slow embedding");
        }
        Ok(v)
    }
}

/// BGE-M3 (XLM-RoBERTa) run locally through candle.
#[derive(Clone)]
pub struct LocalEmbedder {
    inner: Arc<LoadedModel>,
}

impl LocalEmbedder {
    /// Loads tokenizer, config and weights from `model_dir`
    /// (`tokenizer.json`, `config.json`, `pytorch_model.bin`).
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_dir = resolve_model_dir(model_dir)?;
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw)?;
        let dim = config.hidden_size;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(&weights_path)
            .with_context(|| format!("reading {}", weights_path.display()))?
            .into_iter()
            .collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!(dim, "embedding model loaded");
        Ok(Self { inner: Arc::new(LoadedModel { model, tokenizer, device, dim }) })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn dim(&self) -> usize { self.inner.dim }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        let joined = tokio::task::spawn_blocking(move || inner.embed(&text)).await;
        match joined {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(ProviderError::rejected(PROVIDER, e.to_string())),
            Err(e) => Err(ProviderError::unavailable(PROVIDER, e.to_string())),
        }
    }
}

/// `APP_MODEL_DIR` wins over the configured directory.
fn resolve_model_dir(configured: &Path) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            debug!(dir = %p.display(), "using APP_MODEL_DIR");
            return Ok(p);
        }
    }
    if configured.exists() {
        return Ok(configured.to_path_buf());
    }
    Err(anyhow!("could not locate embedding model directory {}", configured.display()))
}
