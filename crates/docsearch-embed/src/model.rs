//! XLM-RoBERTa sentence embeddings (BGE-M3 and relatives) loaded from a
//! local model directory containing `tokenizer.json`, `config.json` and
//! either `model.safetensors` or `pytorch_model.bin`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean;
use crate::tokenize::tokenize_batch;
use crate::DeviceHint;

const DEFAULT_MAX_LEN: usize = 256;

fn candle_err(e: candle_core::Error) -> Error {
    Error::Embedding(e.to_string())
}

pub struct CandleEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
}

impl CandleEmbedder {
    pub fn load(model_dir: &Path, hint: DeviceHint) -> Result<Self> {
        if !model_dir.is_dir() {
            return Err(Error::DependencyUnavailable(format!(
                "model directory {} not found",
                model_dir.display()
            )));
        }
        let device = select_device(hint);

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            Error::DependencyUnavailable(format!(
                "failed to load tokenizer {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).map_err(|e| Error::io(&config_path, e))?;
        let config: XLMRobertaConfig =
            serde_json::from_str(&raw).map_err(|e| Error::json(&config_path, e))?;
        let meta: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| Error::json(&config_path, e))?;
        let dim = meta
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(1024) as usize;
        let max_len = meta
            .get("max_position_embeddings")
            .and_then(serde_json::Value::as_u64)
            .map_or(DEFAULT_MAX_LEN, |n| (n as usize).saturating_sub(2).min(DEFAULT_MAX_LEN));

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(candle_err)?;

        let model_id = model_dir.display().to_string();
        tracing::info!(model = %model_id, dim, max_len, "loaded embedding model");
        Ok(Self {
            model,
            tokenizer,
            device,
            model_id,
            dim,
            max_len,
        })
    }
}

fn load_weights(dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = dir.join("model.safetensors");
    if safetensors.is_file() {
        return candle_core::safetensors::load(&safetensors, device).map_err(candle_err);
    }
    let pickle = dir.join("pytorch_model.bin");
    if pickle.is_file() {
        let tensors = candle_core::pickle::read_all(&pickle).map_err(candle_err)?;
        return Ok(tensors.into_iter().collect());
    }
    Err(Error::DependencyUnavailable(format!("no model weights found in {}", dir.display())))
}

impl Embedder for CandleEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like().map_err(candle_err)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)
            .map_err(candle_err)?;
        let pooled = masked_mean(&hidden, &attention_mask).map_err(candle_err)?;
        let rows: Vec<Vec<f32>> = pooled
            .to_dtype(DType::F32)
            .and_then(|t| t.to_device(&Device::Cpu))
            .and_then(|t| t.to_vec2())
            .map_err(candle_err)?;
        tracing::debug!(
            batch = texts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "embedded batch"
        );
        Ok(rows)
    }
}
