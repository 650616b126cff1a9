//! Per-query candidate lists (C4) and the padded result container
//! returned to callers (C6).
use fnv::FnvHashMap;

/// Sentinel used to pad a [`LocalTopK`]/[`QueryResult`] row out to a fixed
/// width. Sorts below every real candidate count (spec.md section 9.2):
/// the merge comparator treats it as negative infinity, even though it is
/// still written to the wire as the literal value `u32::MAX`.
pub const PAD_LABEL: u32 = u32::MAX;

/// One rank's local top-`k` candidates for a single query, as
/// `(label, count)` pairs sorted by descending count, padded with
/// [`PAD_LABEL`]/`0` up to `k` entries.
#[derive(Debug, Clone)]
pub struct LocalTopK {
    pub entries: Vec<(u32, u32)>,
}

impl LocalTopK {
    /// Reduce a candidate-frequency histogram to its top-`k` entries,
    /// breaking count ties by smaller label (deterministic, so independent
    /// ranks agree on ordering when merged).
    pub fn from_histogram(histogram: FnvHashMap<u32, u32>, k: usize) -> Self {
        let mut entries: Vec<(u32, u32)> = histogram.into_iter().collect();
        entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries.truncate(k);
        while entries.len() < k {
            entries.push((PAD_LABEL, 0));
        }
        LocalTopK { entries }
    }

    /// Merge two already-sorted top-`k` lists into one top-`k` list,
    /// summing counts for labels both sides agree on (spec.md section 9.1:
    /// the summing-merge variant, chosen over the reference's
    /// duplicate-keeping behavior).
    pub fn merge(a: &LocalTopK, b: &LocalTopK, k: usize) -> LocalTopK {
        let mut combined: FnvHashMap<u32, u32> = FnvHashMap::default();
        for &(label, count) in a.entries.iter().chain(b.entries.iter()) {
            if label == PAD_LABEL {
                continue;
            }
            *combined.entry(label).or_insert(0) += count;
        }
        LocalTopK::from_histogram(combined, k)
    }

    pub fn is_pad(&self, i: usize) -> bool {
        self.entries[i].0 == PAD_LABEL
    }
}

/// The flattened `n x k` result of a batch query: row `q`'s entries are
/// `ids[q*k..(q+1)*k]` with matching `counts[q*k..(q+1)*k]`, padded with
/// [`PAD_LABEL`]/`0` where fewer than `k` candidates were found. `lengths[q]`
/// records where the real candidates end and the padding begins, per the
/// unpack phase of spec.md section 4.4 (copy ids "until either reaching `k`
/// or hitting `id == u32::MAX`; record the true length per query").
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub n: usize,
    pub k: usize,
    pub ids: Vec<u32>,
    pub counts: Vec<u32>,
    lengths: Vec<usize>,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<LocalTopK>, k: usize) -> Self {
        let n = rows.len();
        let mut ids = Vec::with_capacity(n * k);
        let mut counts = Vec::with_capacity(n * k);
        let mut lengths = Vec::with_capacity(n);
        for row in rows {
            let length = row
                .entries
                .iter()
                .position(|&(label, _)| label == PAD_LABEL)
                .unwrap_or(row.entries.len());
            lengths.push(length);
            for (label, count) in row.entries {
                ids.push(label);
                counts.push(count);
            }
        }
        QueryResult { n, k, ids, counts, lengths }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// The number of real (non-padding) candidates found for query `q`.
    pub fn row_len(&self, q: usize) -> usize {
        self.lengths[q]
    }

    /// The real candidate labels for query row `q`, padding trimmed.
    pub fn row(&self, q: usize) -> &[u32] {
        let start = q * self.k;
        &self.ids[start..start + self.lengths[q]]
    }

    pub fn row_counts(&self, q: usize) -> &[u32] {
        let start = q * self.k;
        &self.counts[start..start + self.lengths[q]]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn topk(pairs: &[(u32, u32)], k: usize) -> LocalTopK {
        let mut histogram = FnvHashMap::default();
        for &(l, c) in pairs {
            histogram.insert(l, c);
        }
        LocalTopK::from_histogram(histogram, k)
    }

    #[test]
    fn test_from_histogram_truncates_and_pads() {
        let t = topk(&[(1, 5), (2, 9), (3, 1)], 2);
        assert_eq!(t.entries, vec![(2, 9), (1, 5)]);

        let t = topk(&[(1, 5)], 3);
        assert_eq!(t.entries[0], (1, 5));
        assert_eq!(t.entries[1], (PAD_LABEL, 0));
        assert_eq!(t.entries[2], (PAD_LABEL, 0));
    }

    #[test]
    fn test_merge_sums_matching_labels() {
        let a = topk(&[(1, 3), (2, 1)], 2);
        let b = topk(&[(1, 4), (3, 2)], 2);
        let merged = LocalTopK::merge(&a, &b, 2);
        assert_eq!(merged.entries[0], (1, 7));
    }

    #[test]
    fn test_merge_ignores_pad_entries() {
        let a = topk(&[(1, 3)], 3);
        let b = topk(&[(2, 5)], 3);
        let merged = LocalTopK::merge(&a, &b, 3);
        assert!(merged.entries.iter().any(|&(l, c)| l == 2 && c == 5));
        assert!(merged.entries.iter().any(|&(l, c)| l == 1 && c == 3));
        assert!(merged.is_pad(2));
    }

    #[test]
    fn test_query_result_row_layout() {
        let rows = vec![topk(&[(1, 2)], 2), topk(&[(3, 9)], 2)];
        let qr = QueryResult::from_rows(rows, 2);
        assert_eq!(qr.len(), 2);
        assert_eq!(qr.row(0)[0], 1);
        assert_eq!(qr.row(1)[0], 3);
        assert_eq!(qr.row_counts(1)[0], 9);
    }

    #[test]
    fn test_query_result_row_trims_padding() {
        let rows = vec![topk(&[(1, 2)], 4)];
        let qr = QueryResult::from_rows(rows, 4);
        assert_eq!(qr.row_len(0), 1);
        assert_eq!(qr.row(0), &[1]);
        assert_eq!(qr.row_counts(0), &[2]);
    }

    #[test]
    fn test_query_result_row_full_when_unpadded() {
        let rows = vec![topk(&[(1, 2), (2, 1)], 2)];
        let qr = QueryResult::from_rows(rows, 2);
        assert_eq!(qr.row_len(0), 2);
        assert_eq!(qr.row(0).len(), 2);
    }
}
