//! Raw embedding matrix file: an 8-byte magic, row and column counts as
//! little-endian u64, then row-major little-endian f32 values.

use std::fs;
use std::path::Path;

use docsearch_core::error::{Error, Result};

pub const VECTORS_FILE: &str = "vectors.bin";
const MAGIC: &[u8; 8] = b"DSVEC001";
const HEADER_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub dim: usize,
    pub rows: Vec<Vec<f32>>,
}

/// Write the matrix and return the BLAKE3 hex digest of the file contents.
pub fn write_matrix(path: &Path, dim: usize, rows: &[Vec<f32>]) -> Result<String> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + rows.len() * dim * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&(rows.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&(dim as u64).to_le_bytes());
    for row in rows {
        for x in row {
            bytes.extend_from_slice(&x.to_le_bytes());
        }
    }
    fs::write(path, &bytes).map_err(|e| Error::io(path, e))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Read a matrix written by [`write_matrix`], returning it with its digest.
pub fn read_matrix(path: &Path) -> Result<(Matrix, String)> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let digest = blake3::hash(&bytes).to_hex().to_string();
    if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
        return Err(Error::manifest(path, "not a docsearch vector file"));
    }
    let read_u64 = |at: usize| {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[at..at + 8]);
        u64::from_le_bytes(buf) as usize
    };
    let n_rows = read_u64(8);
    let dim = read_u64(16);
    let body = &bytes[HEADER_LEN..];
    if Some(body.len()) != n_rows.checked_mul(dim).and_then(|n| n.checked_mul(4)) {
        return Err(Error::manifest(
            path,
            format!("vector file truncated: expected {n_rows}x{dim} values"),
        ));
    }
    let values: Vec<f32> = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let rows = if dim == 0 {
        vec![Vec::new(); n_rows]
    } else {
        values.chunks_exact(dim).map(<[f32]>::to_vec).collect()
    };
    Ok((Matrix { dim, rows }, digest))
}
