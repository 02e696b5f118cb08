use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use docsearch_core::config::VectorConfig;
use docsearch_core::error::{Error, Result};
use docsearch_core::manifest::{read_chunks, write_chunks, IndexManifest, CHUNKS_FILE};
use docsearch_core::traits::{new_index_id, Embedder, SearchIndex};
use docsearch_core::types::{sort_ranked, Chunk, SearchMode, SearchQuery, SearchResult};
use docsearch_embed::load_embedder;

use crate::flat::{l2_normalize, FlatIndex, Metric};
use crate::storage::{read_matrix, write_matrix, VECTORS_FILE};

pub const BACKEND_NAME: &str = "flat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPayload {
    pub model: String,
    pub normalize: bool,
    pub batch_size: usize,
    #[serde(default)]
    pub device: Option<String>,
    pub dim: usize,
    pub count: usize,
    pub vectors_blake3: String,
}

/// Embedding similarity over a flat matrix.
///
/// Embeddings are computed once per chunk (only the tail added since the
/// last rebuild is encoded) and kept raw; the similarity structure is rebuilt
/// from the whole matrix after every `add`.
pub struct VectorIndex {
    id: String,
    config: VectorConfig,
    snapshot: serde_json::Value,
    embedder: Arc<dyn Embedder>,
    chunks: Vec<Chunk>,
    raw: Vec<Vec<f32>>,
    flat: FlatIndex,
}

impl VectorIndex {
    /// Resolve the embedder from `config.model`.
    pub fn new(config: VectorConfig) -> Result<Self> {
        let embedder = load_embedder(&config)?;
        Ok(Self::with_embedder(config, embedder))
    }

    pub fn with_embedder(config: VectorConfig, embedder: Arc<dyn Embedder>) -> Self {
        let snapshot = serde_json::to_value(&config).unwrap_or(serde_json::Value::Null);
        let flat = FlatIndex::build(metric_for(&config), embedder.dim(), &[]);
        Self {
            id: new_index_id(),
            config,
            snapshot,
            embedder,
            chunks: Vec::new(),
            raw: Vec::new(),
            flat,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_config_snapshot(mut self, snapshot: serde_json::Value) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn config(&self) -> &VectorConfig {
        &self.config
    }

    pub fn dim(&self) -> usize {
        self.embedder.dim()
    }

    pub fn metric(&self) -> Metric {
        self.flat.metric()
    }

    /// Raw embeddings in corpus order.
    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.raw
    }

    fn encode_pending(&mut self) -> Result<()> {
        let dim = self.embedder.dim();
        let start = self.raw.len();
        for batch in self.chunks[start..].chunks(self.config.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            if vectors.len() != texts.len() {
                return Err(Error::Embedding(format!(
                    "embedder returned {} vectors for a batch of {}",
                    vectors.len(),
                    texts.len()
                )));
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
                return Err(Error::Embedding(format!(
                    "embedding width {} does not match model dimension {dim}",
                    bad.len()
                )));
            }
            self.raw.extend(vectors);
        }
        tracing::debug!(
            index = %self.id,
            encoded = self.raw.len() - start,
            total = self.raw.len(),
            "encoded new chunks"
        );
        Ok(())
    }

    fn rebuild_structure(&mut self) {
        let rows: Vec<Vec<f32>> = if self.config.normalize_embeddings {
            self.raw
                .iter()
                .map(|v| {
                    let mut v = v.clone();
                    l2_normalize(&mut v);
                    v
                })
                .collect()
        } else {
            self.raw.clone()
        };
        self.flat = FlatIndex::build(metric_for(&self.config), self.embedder.dim(), &rows);
        tracing::debug!(
            index = %self.id,
            rows = self.flat.len(),
            metric = self.flat.metric().as_str(),
            "rebuilt flat index"
        );
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let manifest = IndexManifest::read_expecting(dir, SearchMode::Vector)?;
        let payload: VectorPayload = manifest.backend_payload(dir)?;
        let embedder = load_embedder(&payload_config(&payload))?;
        Self::from_parts(dir, manifest, payload, embedder)
    }

    /// Load with a caller-supplied embedder; its dimension must match the
    /// persisted matrix.
    pub fn load_with_embedder(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let manifest = IndexManifest::read_expecting(dir, SearchMode::Vector)?;
        let payload: VectorPayload = manifest.backend_payload(dir)?;
        Self::from_parts(dir, manifest, payload, embedder)
    }

    fn from_parts(
        dir: &Path,
        manifest: IndexManifest,
        payload: VectorPayload,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let manifest_path = IndexManifest::path_in(dir);
        if embedder.dim() != payload.dim {
            return Err(Error::Configuration(format!(
                "embedder '{}' produces {}-d vectors but the index stores {}-d vectors",
                embedder.model_id(),
                embedder.dim(),
                payload.dim
            )));
        }
        let chunks = read_chunks(&dir.join(CHUNKS_FILE))?;
        let (matrix, digest) = read_matrix(&dir.join(VECTORS_FILE))?;
        if digest != payload.vectors_blake3 {
            return Err(Error::manifest(
                &manifest_path,
                "vector file digest does not match manifest",
            ));
        }
        if matrix.rows.len() != payload.count || chunks.len() != payload.count {
            return Err(Error::manifest(
                &manifest_path,
                format!(
                    "manifest records {} vectors, found {} vectors and {} chunks",
                    payload.count,
                    matrix.rows.len(),
                    chunks.len()
                ),
            ));
        }
        if payload.count > 0 && matrix.dim != payload.dim {
            return Err(Error::manifest(
                &manifest_path,
                format!("vector file is {}-d, manifest says {}-d", matrix.dim, payload.dim),
            ));
        }

        let config = payload_config(&payload);
        let mut index = Self::with_embedder(config, embedder)
            .with_id(manifest.index_id)
            .with_config_snapshot(manifest.config);
        index.chunks = chunks;
        index.raw = matrix.rows;
        index.rebuild_structure();
        tracing::info!(dir = %dir.display(), vectors = index.raw.len(), "loaded vector index");
        Ok(index)
    }
}

fn metric_for(config: &VectorConfig) -> Metric {
    if config.normalize_embeddings {
        Metric::InnerProduct
    } else {
        Metric::L2
    }
}

fn payload_config(payload: &VectorPayload) -> VectorConfig {
    VectorConfig {
        model: payload.model.clone(),
        batch_size: payload.batch_size,
        device: payload.device.clone(),
        normalize_embeddings: payload.normalize,
    }
}

impl SearchIndex for VectorIndex {
    type Item = Chunk;

    fn mode(&self) -> SearchMode {
        SearchMode::Vector
    }

    fn index_id(&self) -> &str {
        &self.id
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn add(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        let before = self.chunks.len();
        self.chunks.extend(chunks);
        if let Err(e) = self.encode_pending() {
            // keep chunks and embeddings aligned
            self.chunks.truncate(before);
            self.raw.truncate(before);
            return Err(e);
        }
        self.rebuild_structure();
        Ok(())
    }

    fn search(&self, query: &SearchQuery, top_k: usize) -> Result<Vec<SearchResult>> {
        if self.flat.is_empty() || query.text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut q = self
            .embedder
            .embed_batch(std::slice::from_ref(&query.text))?
            .pop()
            .ok_or_else(|| {
                Error::Embedding("embedder returned no vector for the query".to_string())
            })?;
        if q.len() != self.embedder.dim() {
            return Err(Error::Embedding(format!(
                "query embedding width {} does not match model dimension {}",
                q.len(),
                self.embedder.dim()
            )));
        }
        if self.config.normalize_embeddings {
            l2_normalize(&mut q);
        }
        let depth = if query.filters.is_empty() {
            top_k
        } else {
            self.flat.len()
        };
        let metric = self.flat.metric();
        let mut results: Vec<SearchResult> = self
            .flat
            .search(&q, depth)
            .into_iter()
            .filter_map(|(row, raw)| {
                let chunk = &self.chunks[row];
                query.accepts(chunk).then(|| {
                    let score = metric.score(raw);
                    SearchResult::new(chunk.clone(), score, BACKEND_NAME, SearchMode::Vector)
                        .with_meta("raw_score", raw)
                        .with_meta("metric", metric.as_str())
                })
            })
            .collect();
        sort_ranked(&mut results);
        results.truncate(top_k);
        Ok(results)
    }

    fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        let vectors_blake3 =
            write_matrix(&dir.join(VECTORS_FILE), self.embedder.dim(), &self.raw)?;
        let payload = VectorPayload {
            model: self.embedder.model_id().to_string(),
            normalize: self.config.normalize_embeddings,
            batch_size: self.config.batch_size,
            device: self.config.device.clone(),
            dim: self.embedder.dim(),
            count: self.raw.len(),
            vectors_blake3,
        };
        write_chunks(&dir.join(CHUNKS_FILE), &self.chunks)?;
        IndexManifest::new(SearchMode::Vector, &self.id, self.snapshot.clone(), &payload)?
            .write(dir)?;
        tracing::info!(dir = %dir.display(), vectors = self.raw.len(), "saved vector index");
        Ok(())
    }
}
