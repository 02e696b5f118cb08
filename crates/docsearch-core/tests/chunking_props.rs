use docsearch_core::chunking::{normalize_whitespace, ChunkSegmenter, ChunkingContext};
use docsearch_core::config::ChunkingConfig;
use docsearch_core::document::{Block, Document};
use docsearch_core::progress::NoProgress;
use docsearch_core::types::{keys, MetaValue};
use proptest::prelude::*;

fn body_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,6}", 1..120).prop_map(|words| words.join(" \n"))
}

/// Reassemble one section's tokens by dropping the tokens each chunk shares
/// with its predecessor.
fn undo_overlap(chunks: &[Vec<String>], overlap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tokens in chunks {
        let skip = if out.is_empty() {
            0
        } else {
            overlap.min(tokens.len())
        };
        out.extend(tokens[skip..].iter().cloned());
    }
    out
}

proptest! {
    #[test]
    fn chunks_reconstruct_section_text(
        body in body_strategy(),
        target in 1usize..40,
        overlap_frac in 0usize..100,
        min in 0usize..10,
    ) {
        let overlap = if target > 1 { overlap_frac % target } else { 0 };
        let doc = Document::new("p", vec![Block::heading(1, "S"), Block::text(body.clone())]);
        let cfg = ChunkingConfig {
            target_tokens: target,
            overlap_tokens: overlap,
            min_tokens: min,
            ..ChunkingConfig::default()
        };
        let chunks = ChunkSegmenter::new(cfg)
            .segment(&doc, &ChunkingContext::for_document(&doc), &NoProgress);

        let token_lists: Vec<Vec<String>> = chunks
            .iter()
            .map(|c| c.text.split_whitespace().map(str::to_string).collect())
            .collect();
        let rebuilt = undo_overlap(&token_lists, overlap).join(" ");
        prop_assert_eq!(rebuilt, normalize_whitespace(&body));
    }

    #[test]
    fn only_the_last_window_may_exceed_target(
        body in body_strategy(),
        target in 1usize..30,
        min in 0usize..6,
    ) {
        let doc = Document::new("p", vec![Block::heading(1, "S"), Block::text(body)]);
        let cfg = ChunkingConfig {
            target_tokens: target,
            overlap_tokens: 0,
            min_tokens: min,
            ..ChunkingConfig::default()
        };
        let chunks = ChunkSegmenter::new(cfg)
            .segment(&doc, &ChunkingContext::for_document(&doc), &NoProgress);

        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert!(!chunk.text.trim().is_empty());
            prop_assert_eq!(
                chunk.metadata.get(keys::SECTION_CHUNK_ORDINAL),
                Some(&MetaValue::from(i))
            );
            if i != last {
                prop_assert!(chunk.text.split_whitespace().count() <= target);
            }
        }
    }
}
