//! Chunk segmenter: splits a structured document into bounded token windows
//! aligned to section boundaries.

use std::ops::Range;

use crate::config::ChunkingConfig;
use crate::document::{Document, Section};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::types::{keys, Chunk, MetaValue, Metadata};

/// Per-document provenance stamped onto every chunk it produces.
#[derive(Debug, Clone, Default)]
pub struct ChunkingContext {
    pub document_id: String,
    pub source_path: Option<String>,
    pub metadata: Metadata,
}

impl ChunkingContext {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            ..Self::default()
        }
    }

    pub fn for_document(doc: &Document) -> Self {
        Self {
            document_id: doc.id.clone(),
            source_path: doc.path.clone(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChunkSegmenter {
    config: ChunkingConfig,
}

impl ChunkSegmenter {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn segment(
        &self,
        doc: &Document,
        ctx: &ChunkingContext,
        progress: &dyn ProgressSink,
    ) -> Vec<Chunk> {
        let mut sections = Vec::new();
        if self.config.include_preamble {
            sections.extend(doc.preamble());
        }
        sections.extend(doc.sections(self.config.max_heading_depth));

        let mut chunks = Vec::new();
        for section in &sections {
            let before = chunks.len();
            self.segment_section(section, ctx, &mut chunks);
            progress.report(ProgressEvent::SectionSegmented {
                document_id: ctx.document_id.clone(),
                section_ordinal: section.ordinal,
                chunks: chunks.len() - before,
            });
        }
        tracing::debug!(
            document = %ctx.document_id,
            sections = sections.len(),
            chunks = chunks.len(),
            "segmented document"
        );
        chunks
    }

    fn segment_section(&self, section: &Section, ctx: &ChunkingContext, out: &mut Vec<Chunk>) {
        let normalized = normalize_whitespace(&section.body);
        if normalized.is_empty() {
            return;
        }
        let text = match (&section.heading, self.config.merge_heading) {
            (Some(heading), true) if !heading.trim().is_empty() => {
                format!("{}\n\n{}", heading.trim(), normalized)
            }
            _ => normalized,
        };

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let target = self.config.target_tokens;
        let bodies: Vec<String> = if target == 0 || tokens.len() <= target {
            vec![text]
        } else {
            let windows = window_ranges(tokens.len(), target, self.config.overlap_tokens);
            merge_short_windows(windows, self.config.min_tokens)
                .into_iter()
                .map(|r| tokens[r].join(" "))
                .collect()
        };

        let discriminator = if section.is_preamble() {
            "preamble".to_string()
        } else {
            format!("s{}", section.ordinal)
        };
        for (n, body) in bodies.into_iter().enumerate() {
            let mut metadata = ctx.metadata.clone();
            metadata.insert(keys::DOCUMENT_ID.into(), ctx.document_id.as_str().into());
            metadata.insert(keys::DOCUMENT_PATH.into(), ctx.source_path.clone().into());
            metadata.insert(keys::SECTION_HEADING.into(), section.heading.clone().into());
            metadata.insert(keys::SECTION_LEVEL.into(), section.level.into());
            metadata.insert(keys::SECTION_ORDINAL.into(), MetaValue::Int(section.ordinal));
            metadata.insert(keys::CHUNK_ORDINAL.into(), out.len().into());
            metadata.insert(keys::SECTION_CHUNK_ORDINAL.into(), n.into());
            out.push(Chunk {
                id: format!("{}::{}-{}", ctx.document_id, discriminator, n),
                text: body,
                metadata,
            });
        }
    }
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token ranges of successive windows of `target` tokens with stride
/// `target - overlap` (at least 1). The last window may be shorter.
pub fn window_ranges(len: usize, target: usize, overlap: usize) -> Vec<Range<usize>> {
    if target == 0 || len <= target {
        return vec![0..len];
    }
    let stride = target.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + target).min(len);
        windows.push(start..end);
        if end == len {
            break;
        }
        start += stride;
    }
    windows
}

/// Fold any window shorter than `min` into the one before it. A lone window
/// is always kept. Windows are contiguous, so folding extends the previous
/// range instead of repeating the overlapped tokens.
pub fn merge_short_windows(windows: Vec<Range<usize>>, min: usize) -> Vec<Range<usize>> {
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(windows.len());
    for w in windows {
        match merged.last_mut() {
            Some(prev) if w.len() < min => prev.end = prev.end.max(w.end),
            _ => merged.push(w),
        }
    }
    merged
}
