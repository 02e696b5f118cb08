use std::path::Path;

use crate::error::Result;
use crate::types::{SearchMode, SearchQuery, SearchResult};

/// Text to ordered tokens, used by the keyword backend for corpus and query alike.
pub trait Tokenizer: Send + Sync {
    fn name(&self) -> &str;
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Lowercase, then split on whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase().split_whitespace().map(str::to_string).collect()
    }
}

/// A batched embedding function provided by an ML runtime.
pub trait Embedder: Send + Sync {
    /// Stable identifier recorded in manifests (e.g. `hash:384`).
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Lifecycle shared by the stored backends.
///
/// `add` appends and then rebuilds derived structures over the whole corpus;
/// `search` on an empty backend returns an empty list. Each implementation
/// also offers an inherent `load(dir, ..)` that re-runs the rebuild.
pub trait SearchIndex {
    /// What this backend ingests: chunks, or whole documents for grep.
    type Item;

    fn mode(&self) -> SearchMode;
    fn index_id(&self) -> &str;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add(&mut self, items: Vec<Self::Item>) -> Result<()>;
    fn search(&self, query: &SearchQuery, top_k: usize) -> Result<Vec<SearchResult>>;
    fn save(&self, dir: &Path) -> Result<()>;
}

/// Random identifier used when the caller does not supply one.
pub fn new_index_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
