//! Search configuration and the layered loader.
//!
//! Uses Figment to merge serialized defaults + `docsearch.toml` +
//! `docsearch.<env>.toml` + `APP_*` env vars (`__` separates nested keys).
//! User-supplied paths go through [`expand_path`] for `~` and `${VAR}`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::SearchMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_mode: SearchMode,
    pub top_k: usize,
    pub chunking: ChunkingConfig,
    pub keyword: KeywordConfig,
    pub vector: VectorConfig,
    pub hybrid: HybridConfig,
    pub grep: GrepConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_mode: SearchMode::Keyword,
            top_k: 10,
            chunking: ChunkingConfig::default(),
            keyword: KeywordConfig::default(),
            vector: VectorConfig::default(),
            hybrid: HybridConfig::default(),
            grep: GrepConfig::default(),
        }
    }
}

/// Token budgets for the chunk segmenter. Tokens are whitespace-separated words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size; `0` disables windowing so each section is one chunk.
    pub target_tokens: usize,
    pub overlap_tokens: usize,
    /// Windows shorter than this are folded into the preceding window.
    pub min_tokens: usize,
    pub include_preamble: bool,
    pub merge_heading: bool,
    pub max_heading_depth: Option<u8>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_tokens: 256,
            overlap_tokens: 32,
            min_tokens: 16,
            include_preamble: true,
            merge_heading: false,
            max_heading_depth: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub k1: f32,
    pub b: f32,
    /// `whitespace`, `simple` or `english`.
    pub tokenizer: String,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            tokenizer: "whitespace".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// `hash`, `hash:<dim>`, or a local model directory.
    pub model: String,
    pub batch_size: usize,
    pub device: Option<String>,
    pub normalize_embeddings: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            model: "hash".to_string(),
            batch_size: 32,
            device: None,
            normalize_embeddings: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub keyword_weight: f32,
    pub vector_weight: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 0.5,
            vector_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrepConfig {
    pub regex: bool,
    pub case_insensitive: bool,
    pub before: usize,
    pub after: usize,
    pub line_numbers: bool,
    /// Maximum emitted line width in characters; `0` means unlimited.
    pub max_line_width: usize,
    /// Characters of context kept on each side of a match in a long line.
    pub context_margin: usize,
}

impl Default for GrepConfig {
    fn default() -> Self {
        Self {
            regex: false,
            case_insensitive: false,
            before: 0,
            after: 0,
            line_numbers: true,
            max_line_width: 200,
            context_margin: 40,
        }
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Layer config files found in `dir` over the built-in defaults.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(SearchConfig::default()))
            .merge(Toml::file(dir.join("docsearch.toml")));
        let env_file = match env_name.as_str() {
            "dev" | "development" => Some("docsearch.dev.toml"),
            "prod" | "production" => Some("docsearch.prod.toml"),
            "test" | "testing" => Some("docsearch.test.toml"),
            _ => None,
        };
        if let Some(file) = env_file {
            figment = figment.merge(Toml::file(dir.join(file)));
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn search_config(&self) -> Result<SearchConfig> {
        let config: SearchConfig = self
            .figment
            .extract()
            .map_err(|e| Error::Configuration(format!("invalid search configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.keyword.k1 < 0.0 {
            return Err(Error::Configuration(format!(
                "keyword.k1 must be >= 0, got {}",
                self.keyword.k1
            )));
        }
        if !(0.0..=1.0).contains(&self.keyword.b) {
            return Err(Error::Configuration(format!(
                "keyword.b must be within [0, 1], got {}",
                self.keyword.b
            )));
        }
        if self.vector.batch_size == 0 {
            return Err(Error::Configuration("vector.batch_size must be positive".to_string()));
        }
        if self.hybrid.keyword_weight < 0.0 || self.hybrid.vector_weight < 0.0 {
            return Err(Error::Configuration("hybrid weights must be non-negative".to_string()));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
