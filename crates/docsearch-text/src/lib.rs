//! docsearch-text
//!
//! BM25 keyword ranking over segmented chunks. Tokenization reuses tantivy's
//! analyzers; scoring goes through the `bm25` crate and is rebuilt in memory
//! from the chunk list.

pub mod index;
pub mod ranker;
pub mod tantivy_utils;

pub use index::{KeywordIndex, KeywordPayload};
pub use ranker::{Bm25Ranker, SharedTokenizer};
pub use tantivy_utils::{tokenizer_by_name, AnalyzerTokenizer};
