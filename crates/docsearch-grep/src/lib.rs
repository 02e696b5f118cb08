//! docsearch-grep
//!
//! Literal and regular-expression search over document structure, line by
//! line, with grep-style context and highlighted matches. Independent of the
//! chunk corpus.

pub mod index;
pub mod matcher;
pub mod render;

pub use index::{PatternIndex, PatternPayload, DOCUMENTS_FILE, PREAMBLE_SENTINEL};
pub use matcher::Matcher;
