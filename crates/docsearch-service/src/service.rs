use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use docsearch_core::chunking::{ChunkSegmenter, ChunkingContext};
use docsearch_core::config::{GrepConfig, SearchConfig};
use docsearch_core::document::{Document, DocumentParser, DocumentSource};
use docsearch_core::error::{Error, Result};
use docsearch_core::manifest::{read_chunks, write_chunks, CHUNKS_FILE};
use docsearch_core::progress::{NoProgress, ProgressEvent, ProgressSink};
use docsearch_core::traits::{Embedder, SearchIndex};
use docsearch_core::types::{Chunk, SearchMode, SearchQuery, SearchResult};
use docsearch_grep::PatternIndex;
use docsearch_hybrid::{FusionWeights, HybridSearcher};
use docsearch_text::KeywordIndex;
use docsearch_vector::VectorIndex;

use crate::parser::MarkdownOutlineParser;

pub const SERVICE_VERSION: &str = "docsearch-service/1";
pub const SERVICE_FILE: &str = "service.json";
pub const KEYWORD_DIR: &str = "keyword";
pub const VECTOR_DIR: &str = "vector";
pub const GREP_DIR: &str = "grep";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    Building,
    Ready,
}

/// Top-level descriptor of a saved service directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceManifest {
    pub version: String,
    pub modes: Vec<SearchMode>,
    pub created_at: DateTime<Utc>,
    pub chunk_count: usize,
    pub document_count: usize,
    pub config: SearchConfig,
}

/// Everything a successful build produces. Swapped in as a whole.
#[derive(Default)]
struct Built {
    chunks: Vec<Chunk>,
    documents: Vec<Document>,
    keyword: Option<KeywordIndex>,
    vector: Option<VectorIndex>,
    pattern: Option<PatternIndex>,
}

/// Owns the active corpus and whichever backends were requested.
pub struct SearchService {
    config: SearchConfig,
    parser: Arc<dyn DocumentParser>,
    embedder: Option<Arc<dyn Embedder>>,
    state: ServiceState,
    built: Built,
}

impl SearchService {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            parser: Arc::new(MarkdownOutlineParser),
            embedder: None,
            state: ServiceState::Idle,
            built: Built::default(),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Use this embedder instead of resolving `config.vector.model`.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.built.chunks
    }

    pub fn documents(&self) -> &[Document] {
        &self.built.documents
    }

    pub fn keyword_index(&self) -> Option<&KeywordIndex> {
        self.built.keyword.as_ref()
    }

    pub fn vector_index(&self) -> Option<&VectorIndex> {
        self.built.vector.as_ref()
    }

    pub fn pattern_index(&self) -> Option<&PatternIndex> {
        self.built.pattern.as_ref()
    }

    /// Modes that can be served right now.
    pub fn available_modes(&self) -> Vec<SearchMode> {
        SearchMode::ALL.into_iter().filter(|m| self.backend_missing(*m).is_none()).collect()
    }

    fn backend_missing(&self, mode: SearchMode) -> Option<&'static str> {
        match mode {
            SearchMode::Grep if self.built.pattern.is_none() => Some("pattern"),
            SearchMode::Keyword if self.built.keyword.is_none() => Some("keyword"),
            SearchMode::Vector if self.built.vector.is_none() => Some("vector"),
            SearchMode::Hybrid if self.built.keyword.is_none() => Some("keyword"),
            SearchMode::Hybrid if self.built.vector.is_none() => Some("vector"),
            _ => None,
        }
    }

    pub fn build(&mut self, sources: &[DocumentSource], modes: &[SearchMode]) -> Result<()> {
        self.build_with_progress(sources, modes, &NoProgress)
    }

    /// Parse, segment and index `sources` for `modes`, replacing all prior
    /// state. On error the previous state is kept.
    pub fn build_with_progress(
        &mut self,
        sources: &[DocumentSource],
        modes: &[SearchMode],
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let previous = self.state;
        self.state = ServiceState::Building;
        match self.build_all(sources, modes, progress) {
            Ok(built) => {
                self.built = built;
                self.state = ServiceState::Ready;
                tracing::info!(
                    modes = ?self.available_modes(),
                    chunks = self.built.chunks.len(),
                    "search service ready"
                );
                Ok(())
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    fn build_all(
        &self,
        sources: &[DocumentSource],
        modes: &[SearchMode],
        progress: &dyn ProgressSink,
    ) -> Result<Built> {
        let requested: BTreeSet<SearchMode> = modes.iter().copied().collect();
        if requested.is_empty() {
            return Err(Error::Configuration("no search modes requested".to_string()));
        }
        let want_grep = requested.contains(&SearchMode::Grep);
        let want_keyword = requested.iter().any(|m| m.needs_keyword());
        let want_vector = requested.iter().any(|m| m.needs_vector());

        let segmenter = ChunkSegmenter::new(self.config.chunking.clone());
        let mut seen = HashSet::new();
        let mut built = Built::default();
        for (index, source) in sources.iter().enumerate() {
            let doc = self.parser.parse(source)?;
            if !seen.insert(doc.id.clone()) {
                return Err(Error::Configuration(format!("duplicate document id '{}'", doc.id)));
            }
            progress.report(ProgressEvent::DocumentStarted {
                document_id: doc.id.clone(),
                index,
                total: sources.len(),
            });
            let ctx = ChunkingContext::for_document(&doc).with_metadata(source.metadata.clone());
            let chunks = segmenter.segment(&doc, &ctx, progress);
            if chunks.is_empty() {
                tracing::warn!(document = %doc.id, "document produced no chunks");
            }
            progress.report(ProgressEvent::DocumentSegmented {
                document_id: doc.id.clone(),
                chunks: chunks.len(),
            });
            built.chunks.extend(chunks);
            if want_grep {
                built.documents.push(doc);
            }
        }

        let snapshot = self.config.snapshot();
        if want_keyword {
            let mut index = KeywordIndex::new(self.config.keyword.clone())?
                .with_config_snapshot(snapshot.clone());
            index.add(built.chunks.clone())?;
            progress.report(ProgressEvent::IndexRebuilt {
                mode: SearchMode::Keyword,
                chunks: index.len(),
            });
            built.keyword = Some(index);
        }
        if want_vector {
            let index = match &self.embedder {
                Some(e) => VectorIndex::with_embedder(self.config.vector.clone(), Arc::clone(e)),
                None => VectorIndex::new(self.config.vector.clone())?,
            };
            let mut index = index.with_config_snapshot(snapshot.clone());
            index.add(built.chunks.clone())?;
            progress.report(ProgressEvent::IndexRebuilt {
                mode: SearchMode::Vector,
                chunks: index.len(),
            });
            built.vector = Some(index);
        }
        if want_grep {
            let mut index =
                PatternIndex::new(self.config.grep.clone()).with_config_snapshot(snapshot);
            index.add(built.documents.clone())?;
            progress.report(ProgressEvent::IndexRebuilt {
                mode: SearchMode::Grep,
                chunks: index.len(),
            });
            built.pattern = Some(index);
        }
        Ok(built)
    }

    /// Parse a mode name (aliases accepted); `None` or blank means the
    /// configured default.
    pub fn resolve_mode(&self, mode: Option<&str>) -> Result<SearchMode> {
        match mode.map(str::trim) {
            None | Some("") => Ok(self.config.default_mode),
            Some(name) => name.parse(),
        }
    }

    pub fn search(
        &self,
        text: &str,
        mode: Option<&str>,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let mode = self.resolve_mode(mode)?;
        self.search_query(&SearchQuery::new(text), mode, top_k.unwrap_or(self.config.top_k))
    }

    pub fn search_query(
        &self,
        query: &SearchQuery,
        mode: SearchMode,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if let Some(missing) = self.backend_missing(mode) {
            return Err(Error::Configuration(format!(
                "{mode} search needs the {missing} index, which was not built; \
                 rebuild with mode '{mode}'"
            )));
        }
        tracing::debug!(%mode, query = %query.text, top_k, "search");
        match mode {
            SearchMode::Grep => self.pattern()?.search(query, top_k),
            SearchMode::Keyword => self.keyword()?.search(query, top_k),
            SearchMode::Vector => self.vector()?.search(query, top_k),
            SearchMode::Hybrid => {
                let weights = FusionWeights::from(&self.config.hybrid);
                HybridSearcher::from_options(
                    self.built.keyword.as_ref(),
                    self.built.vector.as_ref(),
                    weights,
                )?
                .search(query, top_k)
            }
        }
    }

    /// Pattern search with per-call options.
    pub fn grep(&self, pattern: &str, options: &GrepConfig) -> Result<Vec<SearchResult>> {
        self.pattern()?.search_with(&SearchQuery::new(pattern), options)
    }

    fn pattern(&self) -> Result<&PatternIndex> {
        self.built.pattern.as_ref().ok_or_else(|| not_built(SearchMode::Grep))
    }

    fn keyword(&self) -> Result<&KeywordIndex> {
        self.built.keyword.as_ref().ok_or_else(|| not_built(SearchMode::Keyword))
    }

    fn vector(&self) -> Result<&VectorIndex> {
        self.built.vector.as_ref().ok_or_else(|| not_built(SearchMode::Vector))
    }

    /// Persist every active backend under `dir`, plus a flat chunk export.
    pub fn save(&self, dir: &Path) -> Result<()> {
        if self.state != ServiceState::Ready {
            return Err(Error::Configuration(
                "nothing to save: the service has not been built".to_string(),
            ));
        }
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        write_chunks(&dir.join(CHUNKS_FILE), &self.built.chunks)?;
        if let Some(index) = &self.built.keyword {
            index.save(&dir.join(KEYWORD_DIR))?;
        }
        if let Some(index) = &self.built.vector {
            index.save(&dir.join(VECTOR_DIR))?;
        }
        if let Some(index) = &self.built.pattern {
            index.save(&dir.join(GREP_DIR))?;
        }
        let manifest = ServiceManifest {
            version: SERVICE_VERSION.to_string(),
            modes: self.available_modes(),
            created_at: Utc::now(),
            chunk_count: self.built.chunks.len(),
            document_count: self.built.documents.len(),
            config: self.config.clone(),
        };
        let path = dir.join(SERVICE_FILE);
        let body = serde_json::to_string_pretty(&manifest).map_err(|e| Error::json(&path, e))?;
        fs::write(&path, body).map_err(|e| Error::io(&path, e))?;
        tracing::info!(dir = %dir.display(), modes = ?manifest.modes, "saved search service");
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_inner(dir, None)
    }

    /// Load, embedding queries with `embedder` instead of the recorded model.
    pub fn load_with_embedder(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::load_inner(dir, Some(embedder))
    }

    fn load_inner(dir: &Path, embedder: Option<Arc<dyn Embedder>>) -> Result<Self> {
        let manifest = read_service_manifest(dir)?;
        let mut service = Self::new(manifest.config.clone());
        service.embedder = embedder;

        let modes: BTreeSet<SearchMode> = manifest.modes.iter().copied().collect();
        let chunks = read_chunks(&dir.join(CHUNKS_FILE))?;
        let keyword = if modes.contains(&SearchMode::Keyword) {
            Some(KeywordIndex::load(&dir.join(KEYWORD_DIR))?)
        } else {
            None
        };
        let vector = if modes.contains(&SearchMode::Vector) {
            let vdir = dir.join(VECTOR_DIR);
            Some(match &service.embedder {
                Some(e) => VectorIndex::load_with_embedder(&vdir, Arc::clone(e))?,
                None => VectorIndex::load(&vdir)?,
            })
        } else {
            None
        };
        let pattern = if modes.contains(&SearchMode::Grep) {
            Some(PatternIndex::load(&dir.join(GREP_DIR))?)
        } else {
            None
        };
        let documents = pattern.as_ref().map(|p| p.documents().to_vec()).unwrap_or_default();

        service.built = Built {
            chunks,
            documents,
            keyword,
            vector,
            pattern,
        };
        service.state = ServiceState::Ready;
        tracing::info!(dir = %dir.display(), modes = ?manifest.modes, "loaded search service");
        Ok(service)
    }
}

fn not_built(mode: SearchMode) -> Error {
    Error::Configuration(format!("the {mode} index was not built"))
}

pub fn read_service_manifest(dir: &Path) -> Result<ServiceManifest> {
    let path = dir.join(SERVICE_FILE);
    if !path.is_file() {
        return Err(Error::manifest(&path, "service manifest not found"));
    }
    let raw = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| Error::json(&path, e))?;
    match value.get("version").and_then(serde_json::Value::as_str) {
        Some(SERVICE_VERSION) => {}
        other => {
            return Err(Error::manifest(
                &path,
                format!("unsupported service version {other:?} (expected '{SERVICE_VERSION}')"),
            ))
        }
    }
    serde_json::from_value(value)
        .map_err(|e| Error::manifest(&path, format!("malformed service manifest: {e}")))
}
