//! Tokenizers built on tantivy's text analysis pipeline.

use std::sync::Arc;

use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream};

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::{Tokenizer, WhitespaceTokenizer};

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with", "or", "but", "not", "this",
    "these", "they", "them", "their", "there", "then", "than", "so", "if", "when", "where", "why",
    "how", "what", "which", "who", "whom", "whose", "can", "could", "should", "would", "may",
    "might", "must", "shall", "do", "does", "did", "have", "had", "having",
];

/// Splits on non-alphanumeric runs and lowercases; optionally drops English
/// stop words.
#[derive(Clone)]
pub struct AnalyzerTokenizer {
    name: &'static str,
    analyzer: TextAnalyzer,
}

impl AnalyzerTokenizer {
    pub fn simple() -> Self {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .build();
        Self {
            name: "simple",
            analyzer,
        }
    }

    pub fn english() -> Self {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
            .build();
        Self {
            name: "english",
            analyzer,
        }
    }
}

impl Tokenizer for AnalyzerTokenizer {
    fn name(&self) -> &str {
        self.name
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        // token_stream needs &mut; analyzers are cheap to clone.
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }
}

/// Resolve a tokenizer by the name stored in config and manifests.
pub fn tokenizer_by_name(name: &str) -> Result<Arc<dyn Tokenizer>> {
    match name {
        "whitespace" => Ok(Arc::new(WhitespaceTokenizer)),
        "simple" => Ok(Arc::new(AnalyzerTokenizer::simple())),
        "english" => Ok(Arc::new(AnalyzerTokenizer::english())),
        other => Err(Error::Configuration(format!(
            "unknown tokenizer '{other}' (expected whitespace, simple or english)"
        ))),
    }
}
