use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use docsearch_core::config::GrepConfig;
use docsearch_core::document::{Block, Document};
use docsearch_core::error::Result;
use docsearch_core::manifest::{read_jsonl, write_jsonl, IndexManifest};
use docsearch_core::traits::{new_index_id, SearchIndex};
use docsearch_core::types::{
    keys, sort_ranked, Chunk, MetaValue, SearchMode, SearchQuery, SearchResult,
};

use crate::matcher::Matcher;
use crate::render::render_line;

pub const BACKEND_NAME: &str = "grep";
pub const DOCUMENTS_FILE: &str = "documents.jsonl";
pub const PREAMBLE_SENTINEL: &str = "<preamble>";
/// Separates non-contiguous context blocks within one section.
pub const BLOCK_SEPARATOR: &str = "--";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternPayload {
    pub document_count: usize,
    pub options: GrepConfig,
}

/// The text directly under one heading (or before the first), split into
/// lines. Deeper headings start their own section so every line is scanned
/// exactly once.
struct LineSection<'a> {
    heading: Option<&'a str>,
    level: u8,
    ordinal: i64,
    lines: Vec<&'a str>,
}

fn line_sections(doc: &Document) -> Vec<LineSection<'_>> {
    let mut out = vec![LineSection {
        heading: None,
        level: 0,
        ordinal: -1,
        lines: Vec::new(),
    }];
    let mut ordinal = 0;
    for block in &doc.blocks {
        match block {
            Block::Heading { level, text } => {
                out.push(LineSection {
                    heading: Some(text),
                    level: *level,
                    ordinal,
                    lines: Vec::new(),
                });
                ordinal += 1;
            }
            Block::Text { text } => {
                if let Some(current) = out.last_mut() {
                    current.lines.extend(text.split('\n'));
                }
            }
        }
    }
    out
}

/// Line-level pattern search over whole documents.
pub struct PatternIndex {
    id: String,
    options: GrepConfig,
    snapshot: serde_json::Value,
    documents: Vec<Document>,
}

impl PatternIndex {
    pub fn new(options: GrepConfig) -> Self {
        let snapshot = serde_json::to_value(&options).unwrap_or(serde_json::Value::Null);
        Self {
            id: new_index_id(),
            options,
            snapshot,
            documents: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_config_snapshot(mut self, snapshot: serde_json::Value) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn options(&self) -> &GrepConfig {
        &self.options
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Search with per-call options instead of the stored defaults.
    /// The pattern is compiled before any section is scanned.
    pub fn search_with(
        &self,
        query: &SearchQuery,
        options: &GrepConfig,
    ) -> Result<Vec<SearchResult>> {
        let matcher = Matcher::new(&query.text, options.regex, options.case_insensitive)?;
        let mut results = Vec::new();
        for doc in &self.documents {
            for section in line_sections(doc) {
                if let Some(result) = scan_section(doc, &section, &matcher, options) {
                    if query.accepts(&result.chunk) {
                        results.push(result);
                    }
                }
            }
        }
        sort_ranked(&mut results);
        tracing::debug!(pattern = %query.text, sections = results.len(), "pattern search finished");
        Ok(results)
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let manifest = IndexManifest::read_expecting(dir, SearchMode::Grep)?;
        let payload: PatternPayload = manifest.backend_payload(dir)?;
        let documents: Vec<Document> = read_jsonl(&dir.join(DOCUMENTS_FILE))?;
        let mut index = Self::new(payload.options)
            .with_id(manifest.index_id)
            .with_config_snapshot(manifest.config);
        index.documents = documents;
        tracing::info!(
            dir = %dir.display(),
            documents = index.documents.len(),
            "loaded pattern index"
        );
        Ok(index)
    }
}

fn scan_section(
    doc: &Document,
    section: &LineSection<'_>,
    matcher: &Matcher,
    options: &GrepConfig,
) -> Option<SearchResult> {
    let spans: Vec<_> = section.lines.iter().map(|line| matcher.find_spans(line)).collect();
    let hits: Vec<usize> = spans
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_empty())
        .map(|(i, _)| i)
        .collect();
    if hits.is_empty() {
        return None;
    }
    let occurrences: usize = spans.iter().map(Vec::len).sum();

    let last = section.lines.len() - 1;
    let mut visited = BTreeSet::new();
    for &hit in &hits {
        let lo = hit.saturating_sub(options.before);
        let hi = (hit + options.after).min(last);
        visited.extend(lo..=hi);
    }

    let mut emitted: Vec<String> = Vec::with_capacity(visited.len());
    let mut previous: Option<usize> = None;
    for &i in &visited {
        if previous.is_some_and(|p| i > p + 1) {
            emitted.push(BLOCK_SEPARATOR.to_string());
        }
        previous = Some(i);
        let body = render_line(
            section.lines[i],
            &spans[i],
            options.max_line_width,
            options.context_margin,
        );
        if options.line_numbers {
            let marker = if spans[i].is_empty() { '-' } else { ':' };
            emitted.push(format!("{}{marker}{body}", i + 1));
        } else {
            emitted.push(body);
        }
    }

    let heading = section.heading.unwrap_or(PREAMBLE_SENTINEL);
    let chunk = Chunk::new(format!("{}::grep::{heading}", doc.id), emitted.join("\n"))
        .with_meta(keys::DOCUMENT_ID, doc.id.as_str())
        .with_meta(keys::DOCUMENT_PATH, doc.path.clone())
        .with_meta(keys::SECTION_HEADING, section.heading)
        .with_meta(keys::SECTION_LEVEL, section.level)
        .with_meta(keys::HEADING_ORDINAL, section.ordinal);
    let first_line = hits[0] + 1;
    Some(
        SearchResult::new(chunk, occurrences as f32, BACKEND_NAME, SearchMode::Grep)
            .with_meta("occurrences", occurrences)
            .with_meta("matched_lines", hits.len())
            .with_meta("first_line", first_line)
            .with_meta("regex", MetaValue::from(options.regex)),
    )
}

impl SearchIndex for PatternIndex {
    type Item = Document;

    fn mode(&self) -> SearchMode {
        SearchMode::Grep
    }

    fn index_id(&self) -> &str {
        &self.id
    }

    fn len(&self) -> usize {
        self.documents.len()
    }

    /// Nothing is derived from documents ahead of a query.
    fn add(&mut self, documents: Vec<Document>) -> Result<()> {
        self.documents.extend(documents);
        Ok(())
    }

    /// Every section with a hit is returned; `top_k` is ignored.
    fn search(&self, query: &SearchQuery, _top_k: usize) -> Result<Vec<SearchResult>> {
        self.search_with(query, &self.options)
    }

    fn save(&self, dir: &Path) -> Result<()> {
        let payload = PatternPayload {
            document_count: self.documents.len(),
            options: self.options.clone(),
        };
        IndexManifest::new(SearchMode::Grep, &self.id, self.snapshot.clone(), &payload)?
            .write(dir)?;
        write_jsonl(&dir.join(DOCUMENTS_FILE), &self.documents)?;
        tracing::info!(
            dir = %dir.display(),
            documents = self.documents.len(),
            "saved pattern index"
        );
        Ok(())
    }
}
