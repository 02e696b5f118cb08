//! Versioned persistence envelope shared by every backend, plus the
//! line-delimited chunk file written next to it.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Chunk, SearchMode};

/// Bumped whenever the on-disk layout changes incompatibly.
pub const MANIFEST_VERSION: &str = "docsearch-index/1";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const CHUNKS_FILE: &str = "chunks.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: String,
    pub mode: SearchMode,
    pub index_id: String,
    pub created_at: DateTime<Utc>,
    /// Opaque snapshot of the configuration in effect at build time.
    pub config: serde_json::Value,
    /// Backend-specific settings (e.g. BM25 `k1`/`b`, embedding model and dim).
    pub backend: serde_json::Value,
}

impl IndexManifest {
    pub fn new(
        mode: SearchMode,
        index_id: &str,
        config: serde_json::Value,
        backend: &impl Serialize,
    ) -> Result<Self> {
        let backend = serde_json::to_value(backend).map_err(|e| Error::json(MANIFEST_FILE, e))?;
        Ok(Self {
            version: MANIFEST_VERSION.to_string(),
            mode,
            index_id: index_id.to_string(),
            created_at: Utc::now(),
            config,
            backend,
        })
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        let path = Self::path_in(dir);
        let body = serde_json::to_string_pretty(self).map_err(|e| Error::json(&path, e))?;
        fs::write(&path, body).map_err(|e| Error::io(&path, e))
    }

    /// Read and validate. A missing file or an unknown version is fatal.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = Self::path_in(dir);
        if !path.is_file() {
            return Err(Error::manifest(&path, "manifest file not found"));
        }
        let raw = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| Error::json(&path, e))?;
        match value.get("version").and_then(serde_json::Value::as_str) {
            Some(MANIFEST_VERSION) => {}
            Some(other) => {
                return Err(Error::manifest(
                    &path,
                    format!(
                        "unsupported manifest version '{other}' (expected '{MANIFEST_VERSION}')"
                    ),
                ));
            }
            None => return Err(Error::manifest(&path, "manifest has no version field")),
        }
        serde_json::from_value(value)
            .map_err(|e| Error::manifest(&path, format!("malformed manifest: {e}")))
    }

    /// Read and check that the directory holds an index of `mode`.
    pub fn read_expecting(dir: &Path, mode: SearchMode) -> Result<Self> {
        let manifest = Self::read(dir)?;
        if manifest.mode != mode {
            return Err(Error::manifest(
                Self::path_in(dir),
                format!("expected a {mode} index, found {}", manifest.mode),
            ));
        }
        Ok(manifest)
    }

    pub fn backend_payload<T: DeserializeOwned>(&self, dir: &Path) -> Result<T> {
        serde_json::from_value(self.backend.clone()).map_err(|e| {
            Error::manifest(Self::path_in(dir), format!("malformed backend payload: {e}"))
        })
    }

    pub fn config_snapshot<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.config.clone()).ok()
    }
}

pub fn write_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    write_jsonl(path, chunks)
}

pub fn read_chunks(path: &Path) -> Result<Vec<Chunk>> {
    read_jsonl(path)
}

/// One JSON object per line; blank lines are skipped.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| Error::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line).map_err(|e| Error::json(path, e))?);
    }
    Ok(out)
}

pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut writer, item).map_err(|e| Error::json(path, e))?;
        writer.write_all(b"\n").map_err(|e| Error::io(path, e))?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}
