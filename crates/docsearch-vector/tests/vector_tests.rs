use std::sync::{Arc, Mutex};

use docsearch_core::config::VectorConfig;
use docsearch_core::traits::{Embedder, SearchIndex};
use docsearch_core::types::keys;
use docsearch_core::{Chunk, Error, MetaValue, Result, SearchQuery};
use docsearch_embed::HashEmbedder;
use docsearch_vector::storage::VECTORS_FILE;
use docsearch_vector::{Metric, VectorIndex};
use tempfile::TempDir;

fn corpus() -> Vec<Chunk> {
    vec![
        Chunk::new("a", "rust borrow checker lifetimes").with_meta(keys::DOCUMENT_ID, "lang"),
        Chunk::new("b", "sourdough bread starter flour").with_meta(keys::DOCUMENT_ID, "food"),
        Chunk::new("c", "rust ownership and borrow rules").with_meta(keys::DOCUMENT_ID, "lang"),
    ]
}

fn hash_config() -> VectorConfig {
    VectorConfig {
        model: "hash".into(),
        ..VectorConfig::default()
    }
}

/// Records the size of every batch it is asked to embed.
struct CountingEmbedder {
    inner: HashEmbedder,
    batches: Mutex<Vec<usize>>,
}

impl Embedder for CountingEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_len(&self) -> usize {
        self.inner.max_len()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batches.lock().unwrap().push(texts.len());
        self.inner.embed_batch(texts)
    }
}

/// Claims 8 dimensions but returns 4.
struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
    fn model_id(&self) -> &str {
        "broken"
    }

    fn dim(&self) -> usize {
        8
    }

    fn max_len(&self) -> usize {
        16
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0; 4]).collect())
    }
}

#[test]
fn empty_index_returns_no_results() {
    let index = VectorIndex::new(hash_config()).unwrap();
    assert!(index.is_empty());
    assert!(index.search(&SearchQuery::new("anything"), 5).unwrap().is_empty());
}

#[test]
fn nearest_chunk_ranks_first_with_raw_value_in_metadata() {
    let mut index = VectorIndex::new(hash_config()).unwrap();
    index.add(corpus()).unwrap();
    let results = index.search(&SearchQuery::new("sourdough flour"), 3).unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id(), "b");
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(index.metric(), Metric::InnerProduct);
    assert_eq!(results[0].metadata.get("metric"), Some(&MetaValue::from("ip")));
    let raw = results[0].metadata.get("raw_score").and_then(MetaValue::as_f64).unwrap();
    assert!((raw as f32 - results[0].score).abs() < 1e-6);
    assert!(results[0].score <= 1.0 + 1e-5, "cosine of unit vectors");
}

#[test]
fn unnormalized_index_uses_negated_l2() {
    let cfg = VectorConfig {
        normalize_embeddings: false,
        ..hash_config()
    };
    let mut index = VectorIndex::new(cfg).unwrap();
    index.add(corpus()).unwrap();
    let results = index.search(&SearchQuery::new("sourdough bread starter flour"), 3).unwrap();

    assert_eq!(index.metric(), Metric::L2);
    assert_eq!(results[0].id(), "b");
    assert!(results[0].score.abs() < 1e-6, "identical text is at distance 0");
    assert!(results.iter().all(|r| r.score <= 0.0));
    let raw = results[1].metadata.get("raw_score").and_then(MetaValue::as_f64).unwrap();
    assert!((raw as f32 + results[1].score).abs() < 1e-4);
}

#[test]
fn only_new_chunks_are_encoded_in_batches() {
    let embedder = Arc::new(CountingEmbedder {
        inner: HashEmbedder::new(32),
        batches: Mutex::new(Vec::new()),
    });
    let cfg = VectorConfig {
        batch_size: 2,
        ..hash_config()
    };
    let mut index = VectorIndex::with_embedder(cfg, embedder.clone());

    index.add(corpus()).unwrap();
    index.add(vec![Chunk::new("d", "more rust"), Chunk::new("e", "more bread")]).unwrap();

    assert_eq!(*embedder.batches.lock().unwrap(), vec![2, 1, 2]);
    assert_eq!(index.embeddings().len(), 5);
    assert_eq!(index.len(), 5);
}

#[test]
fn embedding_width_mismatch_fails_and_leaves_index_unchanged() {
    let mut index = VectorIndex::with_embedder(hash_config(), Arc::new(BrokenEmbedder));
    let err = index.add(corpus()).unwrap_err();
    assert!(matches!(err, Error::Embedding(_)), "{err}");
    assert!(index.is_empty());
}

#[test]
fn filters_apply_before_truncation() {
    let mut index = VectorIndex::new(hash_config()).unwrap();
    index.add(corpus()).unwrap();
    let q = SearchQuery::new("sourdough flour").with_filter(keys::DOCUMENT_ID, "lang");
    let results = index.search(&q, 1).unwrap();
    assert_eq!(results.len(), 1);
    assert_ne!(results[0].id(), "b");
}

#[test]
fn save_and_load_preserve_ranking() {
    let tmp = TempDir::new().unwrap();
    let mut index = VectorIndex::new(hash_config()).unwrap().with_id("vec-1");
    index.add(corpus()).unwrap();
    index.save(tmp.path()).unwrap();

    let loaded = VectorIndex::load(tmp.path()).unwrap();
    assert_eq!(loaded.index_id(), "vec-1");
    assert_eq!(loaded.embeddings(), index.embeddings());

    let q = SearchQuery::new("borrow rules");
    let ids = |i: &VectorIndex| -> Vec<String> {
        i.search(&q, 3).unwrap().into_iter().map(|r| r.chunk.id).collect()
    };
    let (before, after) = (ids(&index), ids(&loaded));
    assert_eq!(before, after);
}

#[test]
fn empty_index_survives_round_trip() {
    let tmp = TempDir::new().unwrap();
    VectorIndex::new(hash_config()).unwrap().save(tmp.path()).unwrap();
    let loaded = VectorIndex::load(tmp.path()).unwrap();
    assert!(loaded.search(&SearchQuery::new("x"), 3).unwrap().is_empty());
}

#[test]
fn tampered_vector_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut index = VectorIndex::new(hash_config()).unwrap();
    index.add(corpus()).unwrap();
    index.save(tmp.path()).unwrap();

    let path = tmp.path().join(VECTORS_FILE);
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(VectorIndex::load(tmp.path()), Err(Error::Manifest { .. })));
}

#[test]
fn loading_with_a_different_width_embedder_is_a_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let mut index = VectorIndex::new(hash_config()).unwrap();
    index.add(corpus()).unwrap();
    index.save(tmp.path()).unwrap();

    let res = VectorIndex::load_with_embedder(tmp.path(), Arc::new(HashEmbedder::new(7)));
    assert!(matches!(res, Err(Error::Configuration(_))));
}
