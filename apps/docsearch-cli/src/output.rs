//! Human-readable and JSON rendering of ranked results.

use serde::Serialize;

use docsearch_core::types::keys;
use docsearch_core::{Metadata, SearchResult};

const SNIPPET_MAX_LEN: usize = 200;

#[derive(Serialize)]
struct JsonOutput<'a> {
    query: &'a str,
    mode: &'a str,
    results: Vec<JsonResult<'a>>,
}

#[derive(Serialize)]
struct JsonResult<'a> {
    id: &'a str,
    score: f32,
    text: &'a str,
    chunk_metadata: &'a Metadata,
    metadata: &'a Metadata,
}

pub fn format_json(query: &str, mode: &str, results: &[SearchResult]) -> String {
    let output = JsonOutput {
        query,
        mode,
        results: results
            .iter()
            .map(|r| JsonResult {
                id: r.id(),
                score: r.score,
                text: &r.chunk.text,
                chunk_metadata: &r.chunk.metadata,
                metadata: &r.metadata,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_human(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results for \"{query}\"");
    }
    let mut out = String::new();
    for (rank, r) in results.iter().enumerate() {
        let path = r
            .chunk
            .metadata
            .get(keys::DOCUMENT_PATH)
            .and_then(|v| v.as_str())
            .unwrap_or("");
        out.push_str(&format!("{:>3}. [{:.4}] {}", rank + 1, r.score, r.id()));
        if !path.is_empty() {
            out.push_str(&format!("  ({path})"));
        }
        out.push('\n');
        for line in snippet(&r.chunk.text).lines() {
            out.push_str("     ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Grep blocks are printed whole; prose chunks are shortened.
fn snippet(text: &str) -> String {
    if text.contains('\n') || text.chars().count() <= SNIPPET_MAX_LEN {
        return text.to_string();
    }
    let cut: String = text.chars().take(SNIPPET_MAX_LEN).collect();
    format!("{cut}…")
}
