//! Exhaustive similarity search over a dense row-major matrix.
//!
//! Every row is scored against the query and the k best are kept, so results
//! are the exact nearest neighbours. Ties fall back to row order.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Larger is closer.
    InnerProduct,
    /// Squared Euclidean distance; smaller is closer.
    L2,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InnerProduct => "ip",
            Self::L2 => "l2",
        }
    }

    /// Map a raw value onto the higher-is-better scale.
    pub fn score(self, raw: f32) -> f32 {
        match self {
            Self::InnerProduct => raw,
            Self::L2 => -raw,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlatIndex {
    metric: Metric,
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Rows must all have length `dim`.
    pub fn build(metric: Metric, dim: usize, rows: &[Vec<f32>]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            data.extend_from_slice(row);
        }
        Self { metric, dim, data }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k` nearest rows as `(row, raw value)`, closest first; equal
    /// values keep row order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.dim == 0 || query.len() != self.dim {
            return Vec::new();
        }
        let mut hits: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(i, row)| {
                let raw = match self.metric {
                    Metric::InnerProduct => row.iter().zip(query).map(|(a, b)| a * b).sum(),
                    Metric::L2 => row.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum(),
                };
                (i, raw)
            })
            .collect();
        let metric = self.metric;
        hits.sort_by(|a, b| {
            metric
                .score(b.1)
                .partial_cmp(&metric.score(a.1))
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k);
        hits
    }
}

/// Scale `v` to unit length; the zero vector is left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
