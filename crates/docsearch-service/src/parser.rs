//! Heading-outline parser for Markdown-like text.

use docsearch_core::document::{Block, Document, DocumentParser, DocumentSource};
use docsearch_core::error::Result;

/// Splits text into ATX headings (`#` … `######`) and the text runs between
/// them. Lines inside fenced code blocks are never headings. Each text run
/// keeps its interior blank lines so line numbers stay meaningful.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownOutlineParser;

impl MarkdownOutlineParser {
    pub fn parse_text(&self, id: &str, text: &str) -> Document {
        let mut blocks = Vec::new();
        let mut run: Vec<&str> = Vec::new();
        let mut fence: Option<(char, usize)> = None;

        for line in text.lines() {
            if let Some(open) = fence {
                if closes_fence(line, open) {
                    fence = None;
                }
                run.push(line);
                continue;
            }
            if let Some(open) = opens_fence(line) {
                fence = Some(open);
                run.push(line);
                continue;
            }
            if let Some((level, heading)) = atx_heading(line) {
                flush(&mut run, &mut blocks);
                blocks.push(Block::heading(level, heading));
                continue;
            }
            run.push(line);
        }
        flush(&mut run, &mut blocks);
        Document::new(id, blocks)
    }
}

impl DocumentParser for MarkdownOutlineParser {
    fn parse(&self, source: &DocumentSource) -> Result<Document> {
        let text = source.read_content()?;
        let mut doc = self.parse_text(&source.document_id(), &text);
        if let Some(path) = &source.path {
            doc = doc.with_path(path.display().to_string());
        }
        Ok(doc)
    }
}

fn flush(run: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    let start = run.iter().position(|l| !l.trim().is_empty());
    let end = run.iter().rposition(|l| !l.trim().is_empty());
    if let (Some(s), Some(e)) = (start, end) {
        blocks.push(Block::text(run[s..=e].join("\n")));
    }
    run.clear();
}

fn indent_ok(line: &str) -> Option<&str> {
    let trimmed = line.trim_start_matches(' ');
    (line.len() - trimmed.len() <= 3).then_some(trimmed)
}

fn atx_heading(line: &str) -> Option<(u8, String)> {
    let rest = indent_ok(line)?;
    let hashes = rest.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let after = &rest[hashes..];
    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }
    let mut text = after.trim();
    // optional closing sequence: `## Title ##`
    let stripped = text.trim_end_matches('#');
    if stripped.len() != text.len() && (stripped.is_empty() || stripped.ends_with([' ', '\t'])) {
        text = stripped.trim_end();
    }
    Some((hashes as u8, text.to_string()))
}

fn opens_fence(line: &str) -> Option<(char, usize)> {
    let rest = indent_ok(line)?;
    let c = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let n = rest.chars().take_while(|x| *x == c).count();
    (n >= 3).then_some((c, n))
}

fn closes_fence(line: &str, (c, n): (char, usize)) -> bool {
    let Some(rest) = indent_ok(line) else { return false };
    let count = rest.chars().take_while(|x| *x == c).count();
    count >= n && rest[count..].trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_need_a_space_after_hashes() {
        assert_eq!(atx_heading("## Setup"), Some((2, "Setup".to_string())));
        assert_eq!(atx_heading("#hashtag"), None);
        assert_eq!(atx_heading("####### seven"), None);
        assert_eq!(atx_heading("# Title ##"), Some((1, "Title".to_string())));
        assert_eq!(atx_heading("    # code"), None);
    }
}
