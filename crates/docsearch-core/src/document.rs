//! Structured document model consumed by the segmenter and the pattern engine.
//!
//! Parsing source formats into this model is the job of a [`DocumentParser`];
//! nothing in this module knows about file formats.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Metadata;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    Heading { level: u8, text: String },
    Text { text: String },
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Flat plain-text rendering; headings contribute their text.
    pub fn plain_text(&self) -> &str {
        match self {
            Self::Heading { text, .. } | Self::Text { text } => text,
        }
    }
}

/// A parsed document: an ordered list of headings and text blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub path: Option<String>,
    pub blocks: Vec<Block>,
}

/// A heading plus its trailing content, or the pre-heading preamble.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// `None` for the preamble.
    pub heading: Option<String>,
    /// `0` for the preamble.
    pub level: u8,
    /// Position among extracted sections; `-1` for the preamble.
    pub ordinal: i64,
    /// Flattened plain text, one block per line group.
    pub body: String,
}

impl Section {
    pub fn is_preamble(&self) -> bool {
        self.heading.is_none()
    }
}

impl Document {
    pub fn new(id: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            id: id.into(),
            path: None,
            blocks,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Content before the first heading, if it has any non-whitespace text.
    pub fn preamble(&self) -> Option<Section> {
        let body = self
            .blocks
            .iter()
            .take_while(|b| matches!(b, Block::Text { .. }))
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n");
        if body.trim().is_empty() {
            return None;
        }
        Some(Section {
            heading: None,
            level: 0,
            ordinal: -1,
            body,
        })
    }

    /// Sections for every heading at or above `max_depth` (all headings when
    /// unset). A section runs until the next heading of the same or a higher
    /// level; deeper headings inside it are flattened into its body.
    pub fn sections(&self, max_depth: Option<u8>) -> Vec<Section> {
        let in_scope = |level: u8| max_depth.map_or(true, |d| level <= d);
        let mut sections = Vec::new();
        for (start, block) in self.blocks.iter().enumerate() {
            let Block::Heading { level, text } = block else { continue };
            if !in_scope(*level) {
                continue;
            }
            let body = self.blocks[start + 1..]
                .iter()
                .take_while(|b| !matches!(b, Block::Heading { level: l, .. } if l <= level))
                .map(Block::plain_text)
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(Section {
                heading: Some(text.clone()),
                level: *level,
                ordinal: sections.len() as i64,
                body,
            });
        }
        sections
    }
}

/// Where a document comes from: inline text, a file path, or both.
#[derive(Debug, Clone, Default)]
pub struct DocumentSource {
    pub id: Option<String>,
    pub path: Option<PathBuf>,
    pub content: Option<String>,
    pub metadata: Metadata,
}

impl DocumentSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_text(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Explicit id, else the file stem, else `"document"`.
    pub fn document_id(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        self.path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string())
    }

    pub fn read_content(&self) -> Result<String> {
        if let Some(content) = &self.content {
            return Ok(content.clone());
        }
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| {
                Error::Configuration("document source has neither content nor path".to_string())
            })?;
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
                Ok(String::from_utf8_lossy(&bytes).to_string())
            }
            Err(e) => Err(Error::io(path, e)),
        }
    }
}

/// Turns a source into the structured form. Implemented outside this crate.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, source: &DocumentSource) -> Result<Document>;
}
