use std::collections::HashMap;

use docsearch_core::config::{KeywordConfig, VectorConfig};
use docsearch_core::traits::SearchIndex;
use docsearch_core::types::keys;
use docsearch_core::{Chunk, Error, MetaValue, SearchMode, SearchQuery, SearchResult};
use docsearch_hybrid::fusion::{KEYWORD_SCORE, VECTOR_SCORE};
use docsearch_hybrid::{fuse, FusionWeights, HybridSearcher};
use docsearch_text::KeywordIndex;
use docsearch_vector::VectorIndex;
use proptest::prelude::*;

fn hit(id: &str, score: f32, mode: SearchMode) -> SearchResult {
    SearchResult::new(Chunk::new(id, format!("text of {id}")), score, "test", mode)
}

#[test]
fn weights_are_normalized() {
    let w = FusionWeights::new(3.0, 1.0);
    assert!((w.keyword() - 0.75).abs() < 1e-6);
    assert!((w.vector() - 0.25).abs() < 1e-6);

    let zero = FusionWeights::new(0.0, 0.0);
    assert_eq!((zero.keyword(), zero.vector()), (0.5, 0.5));

    let one_sided = FusionWeights::new(0.0, 2.0);
    assert_eq!((one_sided.keyword(), one_sided.vector()), (0.0, 1.0));
}

#[test]
fn fused_scores_combine_both_sides_and_missing_counts_zero() {
    let kw = vec![hit("a", 2.0, SearchMode::Keyword), hit("b", 1.0, SearchMode::Keyword)];
    let vec = vec![hit("b", 0.9, SearchMode::Vector), hit("c", 0.8, SearchMode::Vector)];
    let fused = fuse(kw, vec, FusionWeights::new(1.0, 1.0), 10);

    let by_id: HashMap<&str, &SearchResult> = fused.iter().map(|r| (r.id(), r)).collect();
    assert_eq!(fused.len(), 3);
    assert!((by_id["a"].score - 1.0).abs() < 1e-6);
    assert!((by_id["b"].score - 0.95).abs() < 1e-6);
    assert!((by_id["c"].score - 0.4).abs() < 1e-6);
    assert_eq!(fused[0].id(), "a");
    assert_eq!(by_id["c"].metadata.get(KEYWORD_SCORE), Some(&MetaValue::Null));
    let b_vector = by_id["b"].metadata.get(VECTOR_SCORE).and_then(MetaValue::as_f64);
    assert_eq!(b_vector.map(|v| v as f32), Some(0.9));
    assert_eq!(fused[0].metadata.get(keys::MODE), Some(&MetaValue::from("hybrid")));
}

#[test]
fn fusion_truncates_to_top_k() {
    let kw = (0..5).map(|i| hit(&format!("k{i}"), i as f32, SearchMode::Keyword)).collect();
    let vec = (0..5).map(|i| hit(&format!("v{i}"), i as f32, SearchMode::Vector)).collect();
    let fused = fuse(kw, vec, FusionWeights::default(), 3);
    assert_eq!(fused.len(), 3);
}

proptest! {
    #[test]
    fn fused_score_is_the_weighted_sum(
        kw_scores in prop::collection::vec(proptest::option::of(0.0f32..10.0), 1..12),
        vec_scores in prop::collection::vec(proptest::option::of(-1.0f32..1.0), 1..12),
        wk in 0.0f32..5.0,
        wv in 0.0f32..5.0,
    ) {
        let hits = |scores: &[Option<f32>], mode: SearchMode| -> Vec<SearchResult> {
            scores
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.map(|s| hit(&format!("c{i}"), s, mode)))
                .collect()
        };
        let kw = hits(&kw_scores, SearchMode::Keyword);
        let vec = hits(&vec_scores, SearchMode::Vector);
        let weights = FusionWeights::new(wk, wv);
        prop_assert!((weights.keyword() + weights.vector() - 1.0).abs() < 1e-5);

        let fused = fuse(kw, vec, weights, usize::MAX);
        for r in &fused {
            let i: usize = r.id()[1..].parse().unwrap();
            let k = kw_scores.get(i).copied().flatten().unwrap_or(0.0);
            let v = vec_scores.get(i).copied().flatten().unwrap_or(0.0);
            prop_assert!((r.score - (weights.keyword() * k + weights.vector() * v)).abs() < 1e-4);
        }
        prop_assert!(fused.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

fn corpus() -> Vec<Chunk> {
    vec![
        Chunk::new("a", "rust borrow checker lifetimes"),
        Chunk::new("b", "sourdough bread starter flour"),
        Chunk::new("c", "borrow a cup of flour"),
    ]
}

#[test]
fn searcher_requires_both_backends() {
    let keyword = KeywordIndex::new(KeywordConfig::default()).unwrap();
    let res = HybridSearcher::<KeywordIndex, VectorIndex>::from_options(
        Some(&keyword),
        None,
        FusionWeights::default(),
    );
    match res {
        Err(Error::Configuration(msg)) => assert!(msg.contains("vector"), "{msg}"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("hybrid must not fall back to keyword-only"),
    }
}

#[test]
fn searcher_fuses_live_backends() {
    let mut keyword = KeywordIndex::new(KeywordConfig::default()).unwrap();
    keyword.add(corpus()).unwrap();
    let mut vector = VectorIndex::new(VectorConfig {
        model: "hash".into(),
        ..VectorConfig::default()
    })
    .unwrap();
    vector.add(corpus()).unwrap();

    let searcher = HybridSearcher::new(&keyword, &vector, FusionWeights::new(0.7, 0.3));
    let results = searcher.search(&SearchQuery::new("sourdough flour"), 2).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id(), "b");
    assert!(results.iter().all(|r| r.metadata.get(KEYWORD_SCORE).is_some()));
}
