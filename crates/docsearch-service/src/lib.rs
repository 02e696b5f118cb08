//! docsearch-service
//!
//! The search façade: builds every requested backend from document sources,
//! resolves modes, answers queries and persists the whole set under one
//! directory.

pub mod parser;
pub mod service;

pub use parser::MarkdownOutlineParser;
pub use service::{read_service_manifest, SearchService, ServiceManifest, ServiceState};
