//! BM25 ranking backed by the `bm25` crate.
//!
//! Chunks are embedded as sparse term vectors with the configured `k1`/`b`
//! and scored one by one through [`Scorer::score`], so chunks sharing no term
//! with the query are still ranked (at 0). The crate's idf is the
//! non-negative `ln(1 + (N - df + 0.5) / (df + 0.5))`. Each distinct query
//! term counts once.

use std::sync::Arc;

use bm25::{Embedder, EmbedderBuilder, Scorer};

use docsearch_core::traits::Tokenizer;

/// Lets any of our tokenizers drive the `bm25` embedder.
#[derive(Clone)]
pub struct SharedTokenizer(pub Arc<dyn Tokenizer>);

impl bm25::Tokenizer for SharedTokenizer {
    fn tokenize(&self, input_text: &str) -> Vec<String> {
        self.0.tokenize(input_text)
    }
}

pub struct Bm25Ranker {
    embedder: Embedder<u32, SharedTokenizer>,
    scorer: Scorer<usize, u32>,
    avgdl: f32,
    len: usize,
}

impl Bm25Ranker {
    /// Fit to `texts`; document `i` of the scorer is `texts[i]`.
    pub fn build(texts: &[&str], tokenizer: Arc<dyn Tokenizer>, k1: f32, b: f32) -> Self {
        let total: usize = texts.iter().map(|t| tokenizer.tokenize(t).len()).sum();
        let avgdl = if total == 0 {
            1.0
        } else {
            total as f32 / texts.len() as f32
        };
        let embedder = EmbedderBuilder::<u32, SharedTokenizer>::with_tokenizer_and_fit_to_corpus(
            SharedTokenizer(tokenizer),
            &[],
        )
        .avgdl(avgdl)
        .k1(k1)
        .b(b)
        .build();
        let mut scorer = Scorer::<usize, u32>::new();
        for (row, text) in texts.iter().enumerate() {
            scorer.upsert(&row, embedder.embed(text));
        }
        Self {
            embedder,
            scorer,
            avgdl,
            len: texts.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn avgdl(&self) -> f32 {
        self.avgdl
    }

    /// One score per document, in corpus order.
    pub fn scores(&self, query: &str) -> Vec<f32> {
        let query = self.embedder.embed(query);
        (0..self.len).map(|row| self.scorer.score(&row, &query).unwrap_or(0.0)).collect()
    }
}
