//! docsearch-core
//!
//! Data model, configuration, chunk segmentation and the persistence envelope
//! shared by the keyword, vector, hybrid and pattern backends.

pub mod chunking;
pub mod config;
pub mod document;
pub mod error;
pub mod manifest;
pub mod progress;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{Chunk, MetaValue, Metadata, SearchMode, SearchQuery, SearchResult};
