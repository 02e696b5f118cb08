//! docsearch-vector
//!
//! Embedding-based similarity search. Vectors come from a pluggable
//! [`Embedder`](docsearch_core::traits::Embedder); the similarity structure
//! is an exhaustive flat matrix scan.

pub mod flat;
pub mod index;
pub mod storage;

pub use flat::{l2_normalize, FlatIndex, Metric};
pub use index::{VectorIndex, VectorPayload};
