//! docsearch-hybrid
//!
//! Fusion of keyword and vector rankings. Hybrid owns no corpus: it borrows
//! two built backends for the duration of a query.

pub mod fusion;

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::SearchIndex;
use docsearch_core::{Chunk, SearchQuery, SearchResult};

pub use fusion::{fuse, FusionWeights};

pub struct HybridSearcher<'a, K, V>
where
    K: SearchIndex<Item = Chunk>,
    V: SearchIndex<Item = Chunk>,
{
    keyword: &'a K,
    vector: &'a V,
    weights: FusionWeights,
}

impl<'a, K, V> HybridSearcher<'a, K, V>
where
    K: SearchIndex<Item = Chunk>,
    V: SearchIndex<Item = Chunk>,
{
    pub fn new(keyword: &'a K, vector: &'a V, weights: FusionWeights) -> Self {
        Self {
            keyword,
            vector,
            weights,
        }
    }

    /// Both backends must exist; hybrid never degrades to one side.
    pub fn from_options(
        keyword: Option<&'a K>,
        vector: Option<&'a V>,
        weights: FusionWeights,
    ) -> Result<Self> {
        match (keyword, vector) {
            (Some(k), Some(v)) => Ok(Self::new(k, v, weights)),
            (k, v) => {
                let missing: Vec<&str> = [("keyword", k.is_none()), ("vector", v.is_none())]
                    .into_iter()
                    .filter_map(|(name, absent)| absent.then_some(name))
                    .collect();
                Err(Error::Configuration(format!(
                    "hybrid search needs both keyword and vector indexes; missing: {}",
                    missing.join(", ")
                )))
            }
        }
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    /// Each side is asked for `top_k` candidates before fusion.
    pub fn search(&self, query: &SearchQuery, top_k: usize) -> Result<Vec<SearchResult>> {
        let keyword = self.keyword.search(query, top_k)?;
        let vector = self.vector.search(query, top_k)?;
        tracing::debug!(keyword = keyword.len(), vector = vector.len(), "fusing candidates");
        Ok(fuse(keyword, vector, self.weights, top_k))
    }
}
