//! Reservoir-sampled bucket bank (C3): a bounded-memory posting list per
//! `(table, row)` cell, plus candidate-frequency query aggregation (C4).
use crate::hash::HashSignatureMatrix;
use crate::utils::create_rng;
use fnv::FnvHashMap;
use rand::Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// Size of the precomputed reservoir-replacement index table (`M` in
/// spec.md section 3).
const GEN_RAND_SIZE: usize = 10_000;
const GEN_RAND_SEED: u64 = 0xC0DE_CAFE_B00B_1E55;

/// `L` tables of `range` rows, each holding up to `reservoirSize` labels,
/// reservoir-sampled over the stream of insertions into that cell.
pub struct BucketBank {
    num_tables: usize,
    range: usize,
    reservoir_size: usize,
    mask: u32,
    data: Vec<AtomicU32>,
    counters: Vec<AtomicU32>,
    gen_rand: Vec<u32>,
}

impl BucketBank {
    /// `range_pow`/`mask` must match the [`crate::hash::HashFamilyParameters`]
    /// this bank is paired with.
    pub fn new(num_tables: usize, reservoir_size: usize, range_pow: u32) -> Self {
        let range: usize = 1usize << range_pow;
        let mask: u32 = if range_pow >= 32 {
            u32::MAX
        } else {
            (1u32 << range_pow) - 1
        };

        let data = (0..num_tables * range * reservoir_size)
            .map(|_| AtomicU32::new(0))
            .collect();
        let counters = (0..num_tables * range).map(|_| AtomicU32::new(0)).collect();

        // Precomputed replacement indices: gen_rand[i] = rand() mod (i+1),
        // deterministic from a fixed seed (spec.md section 3).
        let mut rng = create_rng(GEN_RAND_SEED);
        let mut gen_rand = vec![0u32; GEN_RAND_SIZE];
        for i in 1..GEN_RAND_SIZE {
            gen_rand[i] = rng.gen_range(0, (i + 1) as u32);
        }

        BucketBank {
            num_tables,
            range,
            reservoir_size,
            mask,
            data,
            counters,
            gen_rand,
        }
    }

    fn counter_idx(&self, table: usize, row: usize) -> usize {
        table * self.range + row
    }

    fn data_idx(&self, table: usize, row: usize, slot: usize) -> usize {
        table * self.range * self.reservoir_size + row * self.reservoir_size + slot
    }

    fn row_of(&self, signature: u32) -> usize {
        (signature & self.mask) as usize
    }

    /// Insert `n` records in parallel over records. `hashes.row(i)` gives
    /// the `L` table signatures for record `i`; `label(i)` gives its label.
    pub fn insert(&self, n: usize, hashes: &HashSignatureMatrix, label: impl Fn(usize) -> u32 + Sync) {
        (0..n).into_par_iter().for_each(|i| {
            let lbl = label(i);
            let sigs = hashes.row(i);
            for table in 0..self.num_tables {
                let row = self.row_of(sigs[table]);
                let cidx = self.counter_idx(table, row);
                let arrival = self.counters[cidx].fetch_add(1, Ordering::Relaxed);

                if (arrival as usize) < self.reservoir_size {
                    let didx = self.data_idx(table, row, arrival as usize);
                    self.data[didx].store(lbl, Ordering::Relaxed);
                } else {
                    let slot = self.gen_rand[(arrival as usize) % GEN_RAND_SIZE];
                    if (slot as usize) < self.reservoir_size {
                        let didx = self.data_idx(table, row, slot as usize);
                        self.data[didx].store(lbl, Ordering::Relaxed);
                    }
                }
            }
        });
    }

    /// Arrival count for a given `(table, row)` cell (test/inspection hook).
    pub fn counter(&self, table: usize, row: usize) -> u32 {
        self.counters[self.counter_idx(table, row)].load(Ordering::Relaxed)
    }

    /// The valid prefix of stored labels at a given `(table, row)` cell.
    pub fn cell_labels(&self, table: usize, row: usize) -> Vec<u32> {
        let filled = std::cmp::min(self.counter(table, row) as usize, self.reservoir_size);
        (0..filled)
            .map(|s| self.data[self.data_idx(table, row, s)].load(Ordering::Relaxed))
            .collect()
    }

    /// Query `n` rows of `hashes` for their candidate-frequency top-`k`
    /// list. Data-parallel over queries; does not mutate the bank (inserts
    /// and queries must never overlap in time, per spec.md section 4.2).
    pub fn query_with_counts(
        &self,
        n: usize,
        hashes: &HashSignatureMatrix,
        k: usize,
    ) -> Vec<crate::query::LocalTopK> {
        (0..n)
            .into_par_iter()
            .map(|q| {
                let sigs = hashes.row(q);
                let mut histogram: FnvHashMap<u32, u32> = FnvHashMap::default();
                for table in 0..self.num_tables {
                    let row = self.row_of(sigs[table]);
                    let count = self.counter(table, row) as usize;
                    let filled = std::cmp::min(count, self.reservoir_size);
                    for slot in 0..filled {
                        let didx = self.data_idx(table, row, slot);
                        let label = self.data[didx].load(Ordering::Relaxed);
                        *histogram.entry(label).or_insert(0) += 1;
                    }
                }
                crate::query::LocalTopK::from_histogram(histogram, k)
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hash::HashFamilyParameters;

    fn hash_matrix_for(hf: &HashFamilyParameters, vectors: &[&[u32]]) -> HashSignatureMatrix {
        let l = hf.l;
        let mut sigs = vec![0u32; vectors.len() * l];
        for (i, v) in vectors.iter().enumerate() {
            let h = hf.hash_vector(v);
            sigs[i * l..(i + 1) * l].copy_from_slice(&h);
        }
        HashSignatureMatrix::from_parts(vectors.len(), l, sigs)
    }

    #[test]
    fn test_exact_match() {
        let hf = HashFamilyParameters::new(2, 16, 10).unwrap();
        let bank = BucketBank::new(16, 4, 10);
        let vecs: Vec<&[u32]> = vec![&[1, 2, 3], &[4, 5, 6], &[7, 8, 9]];
        let hashes = hash_matrix_for(&hf, &vecs);
        bank.insert(3, &hashes, |i| i as u32);

        let results = bank.query_with_counts(3, &hashes, 1);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.entries[0].0, i as u32);
        }
    }

    #[test]
    fn test_reservoir_overflow_keeps_exact_arrival_count() {
        let bank = BucketBank::new(1, 128, 4);
        // Force every record into the same (table=0, row=0) cell by using a
        // zero signature directly via a synthetic single-table matrix.
        let sigs = vec![0u32; 10_000];
        let matrix = HashSignatureMatrix::from_parts(10_000, 1, sigs);
        bank.insert(10_000, &matrix, |i| i as u32);
        assert_eq!(bank.counter(0, 0), 10_000);
        let labels = bank.cell_labels(0, 0);
        assert_eq!(labels.len(), 128);
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), 128);
        for l in &labels {
            assert!(*l < 10_000);
        }
    }

    #[test]
    fn test_query_counts_bounded_by_num_tables() {
        let hf = HashFamilyParameters::new(2, 8, 10).unwrap();
        let bank = BucketBank::new(8, 4, 10);
        let vecs: Vec<&[u32]> = vec![&[1, 2, 3]];
        let hashes = hash_matrix_for(&hf, &vecs);
        bank.insert(1, &hashes, |_| 42);
        let results = bank.query_with_counts(1, &hashes, 5);
        for (label, count) in &results[0].entries {
            assert!(*count >= 1 && *count <= 8);
            assert_eq!(*label, 42);
        }
    }
}
