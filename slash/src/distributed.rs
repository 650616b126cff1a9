//! Distributed driver (C5): shard partitioning, batched local insertion,
//! and the four-phase distributed query protocol of spec.md section 4.4.
use crate::bucket_table::BucketBank;
use crate::data::SparseVectorSet;
use crate::error::Result;
use crate::hash::HashFamilyParameters;
use crate::query::{LocalTopK, QueryResult};
use crate::transport::Transport;

/// `ceil(log2(w))`, the number of tree-reduction rounds for a `w`-rank
/// world (spec.md section 4.4).
fn ceil_log2(w: usize) -> u32 {
    if w <= 1 {
        0
    } else {
        (usize::BITS) - (w - 1).leading_zeros()
    }
}

/// Given a logical corpus of `n` vectors split evenly across `world_size`
/// ranks, the `(local_n, local_offset)` owned by `rank` (spec.md section
/// 4.4, "Shard partitioning").
pub fn shard_partition(n: usize, world_size: usize, rank: usize) -> (usize, usize) {
    let base = n / world_size;
    let extra = n % world_size;
    let local_n = base + if rank < extra { 1 } else { 0 };
    let local_offset = base * rank + std::cmp::min(rank, extra);
    (local_n, local_offset)
}

fn pack(rows: &[LocalTopK], k: usize) -> Vec<u32> {
    let mut buf = vec![0u32; rows.len() * k * 2];
    for (q, row) in rows.iter().enumerate() {
        for i in 0..k {
            let (id, count) = row.entries[i];
            buf[q * 2 * k + 2 * i] = id;
            buf[q * 2 * k + 2 * i + 1] = count;
        }
    }
    buf
}

fn unpack(buf: &[u32], n: usize, k: usize) -> Vec<LocalTopK> {
    (0..n)
        .map(|q| {
            let entries = (0..k)
                .map(|i| (buf[q * 2 * k + 2 * i], buf[q * 2 * k + 2 * i + 1]))
                .collect();
            LocalTopK { entries }
        })
        .collect()
}

/// A single rank's local LSH index: one [`HashFamilyParameters`] and one
/// [`BucketBank`], plus the configured result width `topk`.
pub struct SlashIndex {
    hf: HashFamilyParameters,
    bank: BucketBank,
    topk: usize,
}

impl SlashIndex {
    pub fn new(k: usize, l: usize, range_pow: u32, reservoir_size: usize, topk: usize) -> Result<Self> {
        let hf = HashFamilyParameters::new(k, l, range_pow)?;
        let bank = BucketBank::new(l, reservoir_size, range_pow);
        Ok(SlashIndex { hf, bank, topk })
    }

    /// Insert this rank's local shard in batches of `batch_size` vectors,
    /// hashing and inserting each batch in turn (spec.md section 4.4,
    /// "Insertion proceeds in batches").
    pub fn insert_shard(&self, dataset: &SparseVectorSet, batch_size: usize) {
        let n = dataset.len();
        log::debug!("inserting local shard of {} vectors", n);
        let mut start = 0;
        while start < n {
            let batch_n = std::cmp::min(batch_size, n - start);
            let hashes = self.hf.hash(dataset, start, batch_n);
            self.bank
                .insert(batch_n, &hashes, |i| dataset.label(start + i));
            log::debug!("inserted batch [{}, {})", start, start + batch_n);
            start += batch_n;
        }
    }

    /// Local-only query: hash every row of `queries` and return this
    /// rank's padded top-`k` candidate list per query, without any
    /// cross-rank communication.
    pub fn local_query(&self, queries: &SparseVectorSet) -> Vec<LocalTopK> {
        let q = queries.len();
        let hashes = self.hf.hash(queries, 0, q);
        let rows = self.bank.query_with_counts(q, &hashes, self.topk);
        log::debug!("answered {} local queries", q);
        rows
    }

    /// Full distributed query (spec.md section 4.4, phases 1-4): hash and
    /// query locally, then tree-reduce per-query top-k lists across
    /// `transport`'s world, summing counts for matching labels at every
    /// merge step (section 9, open question 1). Only rank 0's result is
    /// populated; every other rank gets an empty [`QueryResult`].
    pub fn distributed_query(
        &self,
        queries: &SparseVectorSet,
        transport: &dyn Transport,
    ) -> Result<QueryResult> {
        let q = queries.len();
        let k = self.topk;
        let mut current = self.local_query(queries);

        let world_size = transport.size();
        let rank = transport.rank();
        let rounds = ceil_log2(world_size);

        for iter in 0..rounds {
            let s = 1usize << iter;
            if rank % (2 * s) == 0 {
                if rank + s < world_size {
                    let mut buf = vec![0u32; q * k * 2];
                    transport.recv(&mut buf, rank + s, iter)?;
                    let other = unpack(&buf, q, k);
                    current = current
                        .iter()
                        .zip(other.iter())
                        .map(|(a, b)| LocalTopK::merge(a, b, k))
                        .collect();
                    log::debug!("rank {} merged round {} from rank {}", rank, iter, rank + s);
                }
            } else if rank % (2 * s) == s {
                let buf = pack(&current, k);
                transport.send(&buf, rank - s, iter)?;
                log::debug!("rank {} sent round {} to rank {}", rank, iter, rank - s);
                return Ok(QueryResult::from_rows(vec![], k));
            }
        }

        if rank == 0 {
            Ok(QueryResult::from_rows(current, k))
        } else {
            Ok(QueryResult::from_rows(vec![], k))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shard_partition_covers_corpus_exactly() {
        for world_size in 1..=5usize {
            let n = 17usize;
            let mut total = 0;
            let mut prev_end = 0;
            for rank in 0..world_size {
                let (local_n, local_offset) = shard_partition(n, world_size, rank);
                assert_eq!(local_offset, prev_end);
                prev_end = local_offset + local_n;
                total += local_n;
            }
            assert_eq!(total, n);
            assert_eq!(prev_end, n);
        }
    }

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(4), 2);
        assert_eq!(ceil_log2(5), 3);
    }

    #[test]
    fn test_pack_unpack_roundtrip() {
        let rows = vec![
            LocalTopK { entries: vec![(1, 2), (3, 4)] },
            LocalTopK { entries: vec![(5, 6), (7, 8)] },
        ];
        let buf = pack(&rows, 2);
        let back = unpack(&buf, 2, 2);
        assert_eq!(back[0].entries, rows[0].entries);
        assert_eq!(back[1].entries, rows[1].entries);
    }
}
