#![feature(test)]
extern crate test;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use slash::{BucketBank, HashFamilyParameters, Labels, SlashIndex, SparseVectorSet};
use test::Bencher;

fn prep_dataset(n: usize, avg_dim: usize) -> SparseVectorSet {
    let mut indices = Vec::with_capacity(n * avg_dim);
    let mut markers = Vec::with_capacity(n + 1);
    markers.push(0u32);
    for i in 0..n {
        let mut rng = SmallRng::seed_from_u64(i as u64);
        for _ in 0..avg_dim {
            indices.push(rng.gen_range(0, 1_000_000u32));
        }
        indices[(markers.last().copied().unwrap() as usize)..].sort_unstable();
        markers.push(indices.len() as u32);
    }
    let values = vec![1.0f32; indices.len()];
    SparseVectorSet::new(indices, values, markers, Labels::Sequential { start: 0 }).unwrap()
}

#[bench]
fn bench_hash_family_construction(b: &mut Bencher) {
    b.iter(|| HashFamilyParameters::new(4, 16, 14).unwrap())
}

#[bench]
fn bench_hash_1000_vectors(b: &mut Bencher) {
    let hf = HashFamilyParameters::new(4, 16, 14).unwrap();
    let dataset = prep_dataset(1000, 20);
    b.iter(|| hf.hash(&dataset, 0, dataset.len()))
}

#[bench]
fn bench_insert_1000_records(b: &mut Bencher) {
    let hf = HashFamilyParameters::new(4, 16, 14).unwrap();
    let dataset = prep_dataset(1000, 20);
    b.iter(|| {
        let bank = BucketBank::new(16, 8, 14);
        let hashes = hf.hash(&dataset, 0, dataset.len());
        bank.insert(dataset.len(), &hashes, |i| dataset.label(i));
    })
}

#[bench]
fn bench_query_100(b: &mut Bencher) {
    let index = SlashIndex::new(4, 16, 14, 8, 10).unwrap();
    let dataset = prep_dataset(1000, 20);
    index.insert_shard(&dataset, 1000);
    let queries = prep_dataset(100, 20);
    b.iter(|| index.local_query(&queries))
}
