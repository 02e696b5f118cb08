//! docsearch-embed
//!
//! Embedding functions for the vector backend. The hashing embedder is always
//! available; a local XLM-RoBERTa model can be loaded when the crate is built
//! with the `candle` feature.

pub mod hash;

#[cfg(feature = "candle")]
pub mod device;
#[cfg(feature = "candle")]
pub mod model;
#[cfg(feature = "candle")]
pub mod pool;
#[cfg(feature = "candle")]
pub mod tokenize;

use std::str::FromStr;
use std::sync::Arc;

use docsearch_core::config::VectorConfig;
use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Embedder;

pub use hash::{HashEmbedder, DEFAULT_HASH_DIM};

/// Where model inference should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceHint {
    #[default]
    Cpu,
    Metal,
    Cuda,
}

impl FromStr for DeviceHint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "metal" | "mps" => Ok(Self::Metal),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(Error::Configuration(format!(
                "unknown device '{other}' (expected cpu, metal or cuda)"
            ))),
        }
    }
}

/// `APP_USE_FAKE_EMBEDDINGS=1|true` forces the hashing embedder.
pub fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// `hash` or `hash:<dim>`; `None` for anything else.
pub fn parse_hash_model(model: &str) -> Option<Result<usize>> {
    let rest = model.strip_prefix("hash")?;
    if rest.is_empty() {
        return Some(Ok(DEFAULT_HASH_DIM));
    }
    let dim = rest.strip_prefix(':')?;
    Some(match dim.parse::<usize>() {
        Ok(0) | Err(_) => Err(Error::Configuration(format!(
            "invalid hash embedder dimension in '{model}'"
        ))),
        Ok(d) => Ok(d),
    })
}

/// Resolve the embedding function named by `config.model`.
pub fn load_embedder(config: &VectorConfig) -> Result<Arc<dyn Embedder>> {
    let device = config
        .device
        .as_deref()
        .map(DeviceHint::from_str)
        .transpose()?
        .unwrap_or_default();

    if let Some(dim) = parse_hash_model(&config.model) {
        return Ok(Arc::new(HashEmbedder::new(dim?)));
    }
    if fake_embeddings_forced() {
        tracing::info!(
            model = %config.model,
            "APP_USE_FAKE_EMBEDDINGS set, using hashing embedder"
        );
        return Ok(Arc::new(HashEmbedder::default()));
    }
    load_model(&config.model, device)
}

#[cfg(feature = "candle")]
fn load_model(model: &str, device: DeviceHint) -> Result<Arc<dyn Embedder>> {
    let dir = docsearch_core::config::expand_path(model);
    Ok(Arc::new(model::CandleEmbedder::load(&dir, device)?))
}

#[cfg(not(feature = "candle"))]
fn load_model(model: &str, _device: DeviceHint) -> Result<Arc<dyn Embedder>> {
    Err(Error::DependencyUnavailable(format!(
        "embedding model '{model}' needs the candle runtime; \
         rebuild docsearch-embed with the `candle` feature or use model = \"hash\""
    )))
}
