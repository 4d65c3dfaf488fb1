use std::cmp::Ordering;

use localkb_core::traits::{Neighbors, VectorRanker};
use localkb_core::{KbError, Result};

/// Row-major matrix of `len() x dim()` floats searched by brute-force inner
/// product. Row `i` belongs to chunk `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIpIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    pub fn from_rows(dim: usize, rows: &[Vec<f32>]) -> Result<Self> {
        let mut index = Self::new(dim);
        index.add(rows)?;
        Ok(index)
    }

    /// Rebuild from a flat buffer; used by the codec.
    pub(crate) fn from_raw(dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim == 0 && !data.is_empty() {
            return Err(KbError::CorruptIndex("zero dimension with non-empty data".into()));
        }
        if dim != 0 && data.len() % dim != 0 {
            return Err(KbError::CorruptIndex(format!("{} floats is not a multiple of dim {dim}", data.len())));
        }
        Ok(Self { dim, data })
    }

    /// Append rows. Every row must have exactly `dim()` entries; nothing is
    /// appended if any row is wrong.
    pub fn add(&mut self, rows: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = rows.iter().find(|r| r.len() != self.dim) {
            return Err(KbError::DimensionMismatch { expected: self.dim, actual: bad.len() });
        }
        self.data.reserve(rows.len() * self.dim);
        for row in rows {
            self.data.extend_from_slice(row);
        }
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.dim
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

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        (i < self.len()).then(|| &self.data[i * self.dim..(i + 1) * self.dim])
    }

    /// Top `k` rows by inner product with `query`, best first. Equal scores
    /// keep ascending row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Neighbors> {
        if query.len() != self.dim {
            return Err(KbError::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let k = k.min(self.len());
        if k == 0 {
            return Ok(Neighbors::default());
        }
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dim)
            .map(|row| row.iter().zip(query).map(|(a, b)| a * b).sum::<f32>())
            .enumerate()
            .collect();
        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);
        let (indices, scores): (Vec<usize>, Vec<f32>) = scored.into_iter().unzip();
        Ok(Neighbors { scores, indices })
    }
}

impl VectorRanker for FlatIpIndex {
    fn len(&self) -> usize {
        FlatIpIndex::len(self)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Neighbors> {
        FlatIpIndex::search(self, query, k)
    }
}
