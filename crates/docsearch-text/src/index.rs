use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use docsearch_core::config::KeywordConfig;
use docsearch_core::error::{Error, Result};
use docsearch_core::manifest::{read_chunks, write_chunks, IndexManifest, CHUNKS_FILE};
use docsearch_core::traits::{new_index_id, SearchIndex, Tokenizer};
use docsearch_core::types::{sort_ranked, Chunk, SearchMode, SearchQuery, SearchResult};

use crate::ranker::Bm25Ranker;
use crate::tantivy_utils::tokenizer_by_name;

pub const BACKEND_NAME: &str = "bm25";

/// What the keyword manifest records beyond the shared envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordPayload {
    pub k1: f32,
    pub b: f32,
    pub tokenizer: String,
    pub chunk_count: usize,
}

/// BM25-ranked corpus. The ranking structure is always derived from the
/// owned chunk list and is never persisted.
pub struct KeywordIndex {
    id: String,
    config: KeywordConfig,
    snapshot: serde_json::Value,
    chunks: Vec<Chunk>,
    tokenizer: Arc<dyn Tokenizer>,
    ranker: Bm25Ranker,
}

impl KeywordIndex {
    pub fn new(config: KeywordConfig) -> Result<Self> {
        let tokenizer = tokenizer_by_name(&config.tokenizer)?;
        Ok(Self::with_tokenizer(config, tokenizer))
    }

    /// Use a caller-supplied tokenizer; `config.tokenizer` is overwritten
    /// with its name so the manifest stays truthful.
    pub fn with_tokenizer(mut config: KeywordConfig, tokenizer: Arc<dyn Tokenizer>) -> Self {
        config.tokenizer = tokenizer.name().to_string();
        let snapshot = serde_json::to_value(&config).unwrap_or(serde_json::Value::Null);
        let ranker = Bm25Ranker::build(&[], tokenizer.clone(), config.k1, config.b);
        Self {
            id: new_index_id(),
            config,
            snapshot,
            chunks: Vec::new(),
            tokenizer,
            ranker,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Configuration snapshot written into the manifest.
    pub fn with_config_snapshot(mut self, snapshot: serde_json::Value) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn config(&self) -> &KeywordConfig {
        &self.config
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    fn rebuild(&mut self) {
        let texts: Vec<&str> = self.chunks.iter().map(|c| c.text.as_str()).collect();
        let (k1, b) = (self.config.k1, self.config.b);
        self.ranker = Bm25Ranker::build(&texts, self.tokenizer.clone(), k1, b);
        tracing::debug!(
            index = %self.id,
            chunks = self.chunks.len(),
            avgdl = self.ranker.avgdl(),
            "rebuilt bm25 ranking"
        );
    }

    /// Load with one of the named tokenizers (`whitespace`, `simple`,
    /// `english`). Indexes saved with a custom tokenizer go through
    /// [`KeywordIndex::load_with_tokenizer`].
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest = IndexManifest::read_expecting(dir, SearchMode::Keyword)?;
        let payload: KeywordPayload = manifest.backend_payload(dir)?;
        let tokenizer = tokenizer_by_name(&payload.tokenizer)?;
        Self::restore(dir, manifest, payload, tokenizer)
    }

    /// Load with a caller-supplied tokenizer whose name must match the one
    /// recorded at save time.
    pub fn load_with_tokenizer(dir: &Path, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        let manifest = IndexManifest::read_expecting(dir, SearchMode::Keyword)?;
        let payload: KeywordPayload = manifest.backend_payload(dir)?;
        if tokenizer.name() != payload.tokenizer {
            return Err(Error::Configuration(format!(
                "index was built with tokenizer '{}' but '{}' was supplied",
                payload.tokenizer,
                tokenizer.name()
            )));
        }
        Self::restore(dir, manifest, payload, tokenizer)
    }

    fn restore(
        dir: &Path,
        manifest: IndexManifest,
        payload: KeywordPayload,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self> {
        let chunks = read_chunks(&dir.join(CHUNKS_FILE))?;
        let config = KeywordConfig {
            k1: payload.k1,
            b: payload.b,
            tokenizer: payload.tokenizer,
        };
        let mut index = Self::with_tokenizer(config, tokenizer)
            .with_id(manifest.index_id)
            .with_config_snapshot(manifest.config);
        index.chunks = chunks;
        index.rebuild();
        tracing::info!(dir = %dir.display(), chunks = index.chunks.len(), "loaded keyword index");
        Ok(index)
    }
}

impl SearchIndex for KeywordIndex {
    type Item = Chunk;

    fn mode(&self) -> SearchMode {
        SearchMode::Keyword
    }

    fn index_id(&self) -> &str {
        &self.id
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn add(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        self.chunks.extend(chunks);
        self.rebuild();
        Ok(())
    }

    fn search(&self, query: &SearchQuery, top_k: usize) -> Result<Vec<SearchResult>> {
        let terms = self.tokenizer.tokenize(&query.text);
        if terms.is_empty() || self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        let scores = self.ranker.scores(&query.text);
        let mut results: Vec<SearchResult> = self
            .chunks
            .iter()
            .zip(scores)
            .filter(|(chunk, _)| query.accepts(chunk))
            .map(|(chunk, score)| {
                SearchResult::new(chunk.clone(), score, BACKEND_NAME, SearchMode::Keyword)
                    .with_meta("query_terms", terms.len())
            })
            .collect();
        sort_ranked(&mut results);
        results.truncate(top_k);
        Ok(results)
    }

    fn save(&self, dir: &Path) -> Result<()> {
        let payload = KeywordPayload {
            k1: self.config.k1,
            b: self.config.b,
            tokenizer: self.config.tokenizer.clone(),
            chunk_count: self.chunks.len(),
        };
        IndexManifest::new(SearchMode::Keyword, &self.id, self.snapshot.clone(), &payload)?
            .write(dir)?;
        write_chunks(&dir.join(CHUNKS_FILE), &self.chunks)?;
        tracing::info!(dir = %dir.display(), chunks = self.chunks.len(), "saved keyword index");
        Ok(())
    }
}
