//! Zero-copy-friendly view of a shard of sparse (SVM-format) vectors.
use crate::error::{Error, Result};

/// How row labels are derived for a [`SparseVectorSet`].
///
/// A corpus partition is usually a contiguous range of the original corpus
/// (`Sequential`), which avoids materializing one label per row; an
/// arbitrary subset needs `Explicit`.
#[derive(Debug, Clone)]
pub enum Labels {
    /// Row `i` has label `labels[i]`.
    Explicit(Vec<u32>),
    /// Row `i` has label `start + i`.
    Sequential { start: u32 },
}

impl Labels {
    pub fn label(&self, row: usize) -> u32 {
        match self {
            Labels::Explicit(v) => v[row],
            Labels::Sequential { start } => start + row as u32,
        }
    }
}

/// A contiguous block of `n` sparse vectors: nonzero indices, their values,
/// and prefix-sum row markers, plus a label per row.
///
/// Invariant: `markers[0] == 0`, `markers` is non-decreasing, and
/// `markers[n] == indices.len() == values.len()`. The hasher ([`crate::hash`])
/// only ever reads `indices`; `values` exist purely for downstream cosine
/// similarity evaluation and are never consulted by the core.
#[derive(Debug, Clone)]
pub struct SparseVectorSet {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
    pub markers: Vec<u32>,
    pub labels: Labels,
}

impl SparseVectorSet {
    pub fn new(
        indices: Vec<u32>,
        values: Vec<f32>,
        markers: Vec<u32>,
        labels: Labels,
    ) -> Result<Self> {
        if markers.is_empty() || markers[0] != 0 {
            return Err(Error::InvalidMarkers {
                reason: "markers must be non-empty and start at 0".into(),
            });
        }
        if !markers.windows(2).all(|w| w[0] <= w[1]) {
            return Err(Error::InvalidMarkers {
                reason: "markers must be non-decreasing".into(),
            });
        }
        let total_nnz = *markers.last().unwrap() as usize;
        if total_nnz != indices.len() || total_nnz != values.len() {
            return Err(Error::InvalidMarkers {
                reason: format!(
                    "markers[n] = {} does not match indices/values length ({}/{})",
                    total_nnz,
                    indices.len(),
                    values.len()
                ),
            });
        }
        let n = markers.len() - 1;
        if let Labels::Explicit(ref v) = labels {
            if v.len() != n {
                return Err(Error::LabelCountMismatch {
                    expected: n,
                    actual: v.len(),
                });
            }
        }
        Ok(SparseVectorSet {
            indices,
            values,
            markers,
            labels,
        })
    }

    /// Number of vectors in this shard.
    pub fn len(&self) -> usize {
        self.markers.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted-and-distinct (by caller contract, see spec error conditions)
    /// nonzero index set of row `i`.
    pub fn row(&self, i: usize) -> &[u32] {
        &self.indices[self.markers[i] as usize..self.markers[i + 1] as usize]
    }

    pub fn row_values(&self, i: usize) -> &[f32] {
        &self.values[self.markers[i] as usize..self.markers[i + 1] as usize]
    }

    pub fn label(&self, i: usize) -> u32 {
        self.labels.label(i)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_construction() {
        let set = SparseVectorSet::new(
            vec![1, 2, 3, 4, 5, 6],
            vec![1.0; 6],
            vec![0, 3, 6],
            Labels::Sequential { start: 10 },
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.row(0), &[1, 2, 3]);
        assert_eq!(set.row(1), &[4, 5, 6]);
        assert_eq!(set.label(0), 10);
        assert_eq!(set.label(1), 11);
    }

    #[test]
    fn test_bad_markers_rejected() {
        assert!(SparseVectorSet::new(vec![], vec![], vec![], Labels::Sequential { start: 0 })
            .is_err());
        assert!(SparseVectorSet::new(
            vec![1],
            vec![1.0],
            vec![0, 2],
            Labels::Sequential { start: 0 }
        )
        .is_err());
    }

    #[test]
    fn test_explicit_label_count_mismatch() {
        let res = SparseVectorSet::new(
            vec![1, 2],
            vec![1.0, 1.0],
            vec![0, 1, 2],
            Labels::Explicit(vec![5]),
        );
        assert!(matches!(res, Err(Error::LabelCountMismatch { .. })));
    }
}
