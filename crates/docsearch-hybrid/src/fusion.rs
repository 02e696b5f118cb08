//! Weighted linear fusion of two ranked lists.

use std::collections::HashMap;

use docsearch_core::config::HybridConfig;
use docsearch_core::types::{sort_ranked, SearchMode, SearchResult};
use docsearch_core::MetaValue;

pub const BACKEND_NAME: &str = "hybrid";
pub const KEYWORD_SCORE: &str = "keyword_score";
pub const VECTOR_SCORE: &str = "vector_score";

/// A weight pair that always sums to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    keyword: f32,
    vector: f32,
}

impl FusionWeights {
    /// Negative inputs count as zero; a zero (or non-finite) sum falls back
    /// to an even split.
    pub fn new(keyword: f32, vector: f32) -> Self {
        let k = keyword.max(0.0);
        let v = vector.max(0.0);
        let sum = k + v;
        if sum > 0.0 && sum.is_finite() {
            Self {
                keyword: k / sum,
                vector: v / sum,
            }
        } else {
            Self {
                keyword: 0.5,
                vector: 0.5,
            }
        }
    }

    pub fn keyword(&self) -> f32 {
        self.keyword
    }

    pub fn vector(&self) -> f32 {
        self.vector
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

impl From<&HybridConfig> for FusionWeights {
    fn from(cfg: &HybridConfig) -> Self {
        Self::new(cfg.keyword_weight, cfg.vector_weight)
    }
}

/// Union both lists by chunk id and rank by
/// `w_k * keyword_score + w_v * vector_score`, a missing side counting 0.
///
/// Ties keep first-seen order: keyword hits, then vector-only hits.
pub fn fuse(
    keyword: Vec<SearchResult>,
    vector: Vec<SearchResult>,
    weights: FusionWeights,
    top_k: usize,
) -> Vec<SearchResult> {
    struct Entry {
        result: SearchResult,
        keyword: Option<f32>,
        vector: Option<f32>,
    }

    let mut order: Vec<Entry> = Vec::with_capacity(keyword.len() + vector.len());
    let mut slot: HashMap<String, usize> = HashMap::new();

    for r in keyword {
        // a backend never repeats a chunk; keep the first if it does
        if slot.contains_key(r.id()) {
            continue;
        }
        slot.insert(r.id().to_string(), order.len());
        let score = r.score;
        order.push(Entry {
            result: r,
            keyword: Some(score),
            vector: None,
        });
    }
    for r in vector {
        match slot.get(r.id()) {
            Some(&i) => {
                if order[i].vector.is_none() {
                    order[i].vector = Some(r.score);
                }
            }
            None => {
                slot.insert(r.id().to_string(), order.len());
                let score = r.score;
                order.push(Entry {
                    result: r,
                    keyword: None,
                    vector: Some(score),
                });
            }
        }
    }

    let mut fused: Vec<SearchResult> = order
        .into_iter()
        .map(|e| {
            let score = weights.keyword * e.keyword.unwrap_or(0.0)
                + weights.vector * e.vector.unwrap_or(0.0);
            SearchResult::new(e.result.chunk, score, BACKEND_NAME, SearchMode::Hybrid)
                .with_meta(KEYWORD_SCORE, MetaValue::from(e.keyword))
                .with_meta(VECTOR_SCORE, MetaValue::from(e.vector))
                .with_meta("keyword_weight", weights.keyword)
                .with_meta("vector_weight", weights.vector)
        })
        .collect();
    sort_ranked(&mut fused);
    fused.truncate(top_k);
    fused
}
