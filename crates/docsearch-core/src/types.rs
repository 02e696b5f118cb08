//! Domain types shared by every backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type ChunkId = String;
pub type Metadata = BTreeMap<String, MetaValue>;

/// Well-known metadata keys stamped onto chunks and results.
pub mod keys {
    pub const DOCUMENT_ID: &str = "document_id";
    pub const DOCUMENT_PATH: &str = "document_path";
    pub const SECTION_HEADING: &str = "section_heading";
    pub const SECTION_LEVEL: &str = "section_level";
    /// Position among the sections the segmenter extracted; `-1` for the preamble.
    pub const SECTION_ORDINAL: &str = "section_ordinal";
    /// Position among every heading of the document, ignoring any depth
    /// limit; `-1` for the preamble. Set on grep results.
    pub const HEADING_ORDINAL: &str = "heading_ordinal";
    pub const CHUNK_ORDINAL: &str = "chunk_ordinal";
    pub const SECTION_CHUNK_ORDINAL: &str = "section_chunk_ordinal";
    pub const BACKEND: &str = "backend";
    pub const MODE: &str = "mode";
}

/// A primitive metadata value. Nested objects are deliberately not
/// representable so the persisted schema stays flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}
impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}
impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}
impl From<usize> for MetaValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}
impl From<u8> for MetaValue {
    fn from(v: u8) -> Self {
        Self::Int(i64::from(v))
    }
}
impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}
impl From<f32> for MetaValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}
impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// An independently indexed slice of a document.
///
/// `id` is unique within a corpus and derived from document, section and
/// ordinal. `text` is never empty. Chunks are immutable once segmented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(id: impl Into<ChunkId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get(keys::DOCUMENT_ID).and_then(MetaValue::as_str)
    }

    pub fn section_heading(&self) -> Option<&str> {
        self.metadata.get(keys::SECTION_HEADING).and_then(MetaValue::as_str)
    }
}

/// Normalized query input, built once per search call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub filters: Metadata,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: Metadata::new(),
        }
    }

    pub fn with_filter(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.filters.insert(key.to_string(), value.into());
        self
    }

    /// A chunk passes when every filter key is present with an equal value.
    pub fn accepts(&self, chunk: &Chunk) -> bool {
        self.filters.iter().all(|(k, v)| chunk.metadata.get(k) == Some(v))
    }
}

/// A scored reference to a chunk. Higher `score` is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SearchResult {
    pub fn new(chunk: Chunk, score: f32, backend: &str, mode: SearchMode) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(keys::BACKEND.to_string(), backend.into());
        metadata.insert(keys::MODE.to_string(), mode.as_str().into());
        Self {
            chunk,
            score,
            metadata,
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}

/// Sort descending by score. The sort is stable, so ties keep input order.
pub fn sort_ranked(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

/// The four retrieval strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Grep,
    Keyword,
    Vector,
    Hybrid,
}

impl SearchMode {
    pub const ALL: [SearchMode; 4] = [Self::Grep, Self::Keyword, Self::Vector, Self::Hybrid];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grep => "grep",
            Self::Keyword => "keyword",
            Self::Vector => "vector",
            Self::Hybrid => "hybrid",
        }
    }

    pub fn needs_keyword(self) -> bool {
        matches!(self, Self::Keyword | Self::Hybrid)
    }

    pub fn needs_vector(self) -> bool {
        matches!(self, Self::Vector | Self::Hybrid)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grep" | "pattern" | "regex" | "g" => Ok(Self::Grep),
            "keyword" | "bm25" | "kw" | "k" => Ok(Self::Keyword),
            "vector" | "semantic" | "vec" | "v" => Ok(Self::Vector),
            "hybrid" | "fusion" | "h" => Ok(Self::Hybrid),
            other => Err(Error::Configuration(format!(
                "unknown search mode '{other}' (expected grep, keyword, vector or hybrid)"
            ))),
        }
    }
}
