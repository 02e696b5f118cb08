use docsearch_core::chunking::{ChunkSegmenter, ChunkingContext};
use docsearch_core::config::{ChunkingConfig, GrepConfig};
use docsearch_core::document::{Block, Document};
use docsearch_core::progress::NoProgress;
use docsearch_core::traits::SearchIndex;
use docsearch_core::types::keys;
use docsearch_core::{Error, MetaValue, SearchQuery};
use docsearch_grep::PatternIndex;
use tempfile::TempDir;

fn intro_outro() -> Document {
    Document::new(
        "guide",
        vec![
            Block::heading(1, "Intro"),
            Block::text("alpha beta alpha"),
            Block::heading(1, "Outro"),
            Block::text("gamma"),
        ],
    )
}

fn numbered() -> Document {
    let body: Vec<String> = (1..=10)
        .map(|i| match i {
            3 | 5 | 9 => format!("line {i} hit"),
            _ => format!("line {i}"),
        })
        .collect();
    Document::new(
        "log",
        vec![
            Block::text("preamble hit here"),
            Block::heading(2, "Body"),
            Block::text(body.join("\n")),
        ],
    )
}

fn index_of(docs: Vec<Document>) -> PatternIndex {
    let mut index = PatternIndex::new(GrepConfig::default());
    index.add(docs).unwrap();
    index
}

#[test]
fn literal_alpha_counts_two_occurrences_in_intro() {
    let index = index_of(vec![intro_outro()]);
    let results = index.search(&SearchQuery::new("alpha"), 10).unwrap();

    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert_eq!(r.id(), "guide::grep::Intro");
    assert_eq!(r.score, 2.0);
    assert_eq!(r.metadata.get("occurrences"), Some(&MetaValue::Int(2)));
    assert_eq!(r.chunk.section_heading(), Some("Intro"));
    assert_eq!(r.chunk.text, "1:<mark>alpha</mark> beta <mark>alpha</mark>");
}

#[test]
fn literal_search_is_case_sensitive_by_default() {
    let index = index_of(vec![intro_outro()]);
    assert!(index.search(&SearchQuery::new("ALPHA"), 10).unwrap().is_empty());

    let opts = GrepConfig {
        case_insensitive: true,
        ..GrepConfig::default()
    };
    assert_eq!(index.search_with(&SearchQuery::new("ALPHA"), &opts).unwrap().len(), 1);
}

#[test]
fn context_windows_merge_and_mark_context_lines() {
    let index = index_of(vec![numbered()]);
    let opts = GrepConfig {
        before: 1,
        after: 1,
        ..GrepConfig::default()
    };
    let results = index.search_with(&SearchQuery::new("hit"), &opts).unwrap();

    let body = results.iter().find(|r| r.id() == "log::grep::Body").unwrap();
    let expected = [
        "2-line 2",
        "3:line 3 <mark>hit</mark>",
        "4-line 4",
        "5:line 5 <mark>hit</mark>",
        "6-line 6",
        "--",
        "8-line 8",
        "9:line 9 <mark>hit</mark>",
        "10-line 10",
    ]
    .join("\n");
    assert_eq!(body.chunk.text, expected);
    assert_eq!(body.score, 3.0);
    assert_eq!(body.metadata.get("first_line"), Some(&MetaValue::Int(3)));
}

#[test]
fn preamble_uses_sentinel_and_ranks_below_busier_sections() {
    let index = index_of(vec![numbered()]);
    let results = index.search(&SearchQuery::new("hit"), 1).unwrap();

    assert_eq!(results.len(), 2, "top_k is ignored");
    assert_eq!(results[0].id(), "log::grep::Body");
    assert_eq!(results[1].id(), "log::grep::<preamble>");
    assert_eq!(results[1].chunk.metadata.get(keys::SECTION_HEADING), Some(&MetaValue::Null));
    assert_eq!(results[1].chunk.metadata.get(keys::HEADING_ORDINAL), Some(&MetaValue::Int(-1)));
}

#[test]
fn line_numbers_can_be_disabled() {
    let index = index_of(vec![intro_outro()]);
    let opts = GrepConfig {
        line_numbers: false,
        ..GrepConfig::default()
    };
    let results = index.search_with(&SearchQuery::new("gamma"), &opts).unwrap();
    assert_eq!(results[0].chunk.text, "<mark>gamma</mark>");
}

#[test]
fn regex_mode_and_invalid_patterns() {
    let index = index_of(vec![intro_outro()]);
    let opts = GrepConfig {
        regex: true,
        ..GrepConfig::default()
    };
    let results = index.search_with(&SearchQuery::new(r"g\w+a"), &opts).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id(), "guide::grep::Outro");

    let err = index.search_with(&SearchQuery::new("[unclosed"), &opts).unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)), "{err}");
}

#[test]
fn invalid_regex_fails_even_on_an_empty_index() {
    let index = PatternIndex::new(GrepConfig {
        regex: true,
        ..GrepConfig::default()
    });
    assert!(matches!(index.search(&SearchQuery::new("(a"), 10), Err(Error::InvalidQuery(_))));
    assert!(index.search(&SearchQuery::new("a"), 10).unwrap().is_empty());
}

#[test]
fn long_lines_are_truncated_around_the_match() {
    let line = format!("{} needle {}", "x".repeat(300), "y".repeat(300));
    let doc = Document::new("wide", vec![Block::heading(1, "W"), Block::text(line)]);
    let index = index_of(vec![doc]);
    let opts = GrepConfig {
        max_line_width: 30,
        context_margin: 5,
        ..GrepConfig::default()
    };
    let results = index.search_with(&SearchQuery::new("needle"), &opts).unwrap();
    assert_eq!(results[0].chunk.text, "1:…xxxx <mark>needle</mark> yyyy…");
}

#[test]
fn filters_restrict_documents() {
    let other = Document::new("other", vec![Block::heading(1, "Intro"), Block::text("alpha")]);
    let index = index_of(vec![intro_outro(), other]);
    let q = SearchQuery::new("alpha").with_filter(keys::DOCUMENT_ID, "other");
    let results = index.search(&q, 10).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id(), "other::grep::Intro");
}

#[test]
fn save_and_load_round_trip() {
    let tmp = TempDir::new().unwrap();
    let index = index_of(vec![intro_outro(), numbered()]).with_id("grep-1");
    index.save(tmp.path()).unwrap();

    let loaded = PatternIndex::load(tmp.path()).unwrap();
    assert_eq!(loaded.index_id(), "grep-1");
    assert_eq!(loaded.documents(), index.documents());
    let q = SearchQuery::new("hit");
    assert_eq!(loaded.search(&q, 10).unwrap(), index.search(&q, 10).unwrap());
}

#[test]
fn heading_ordinal_counts_every_heading_and_leaves_section_ordinal_to_chunks() {
    let doc = Document::new(
        "deep",
        vec![
            Block::heading(1, "Top"),
            Block::text("first"),
            Block::heading(2, "Nested"),
            Block::text("second"),
            Block::heading(1, "Tail"),
            Block::text("needle"),
        ],
    );
    let index = index_of(vec![doc.clone()]);
    let results = index.search(&SearchQuery::new("needle"), 10).unwrap();
    let meta = &results[0].chunk.metadata;
    assert_eq!(meta.get(keys::HEADING_ORDINAL), Some(&MetaValue::Int(2)));
    assert_eq!(meta.get(keys::SECTION_ORDINAL), None);

    let config = ChunkingConfig {
        max_heading_depth: Some(1),
        ..ChunkingConfig::default()
    };
    let ctx = ChunkingContext::for_document(&doc);
    let chunks = ChunkSegmenter::new(config).segment(&doc, &ctx, &NoProgress);
    let tail = chunks.iter().find(|c| c.text.contains("needle")).unwrap();
    assert_eq!(tail.metadata.get(keys::SECTION_ORDINAL), Some(&MetaValue::Int(1)));
}
