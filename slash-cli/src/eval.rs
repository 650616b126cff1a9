//! Evaluator (E4): cosine similarity over sparse vectors and recall@k
//! against a ground-truth file. Adapted from the teacher's `dist.rs`
//! (`l2_norm`/`inner_prod`/`cosine_sim`), whose dense `ndarray` dot
//! products don't apply to sparse index/value pairs -- the merge-join
//! below is the sparse equivalent of `inner_prod`.
use slash::QueryResult;

/// L2 norm of a sparse vector's values.
pub fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Dot product of two sparse vectors given as sorted `(index, value)`
/// pairs, via a merge-join over their index arrays.
pub fn inner_prod(a_idx: &[u32], a_val: &[f32], b_idx: &[u32], b_val: &[f32]) -> f32 {
    let mut i = 0;
    let mut j = 0;
    let mut acc = 0.0f32;
    while i < a_idx.len() && j < b_idx.len() {
        match a_idx[i].cmp(&b_idx[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                acc += a_val[i] * b_val[j];
                i += 1;
                j += 1;
            }
        }
    }
    acc
}

pub fn cosine_sim(a_idx: &[u32], a_val: &[f32], b_idx: &[u32], b_val: &[f32]) -> f32 {
    let denom = l2_norm(a_val) * l2_norm(b_val);
    if denom == 0.0 {
        return 0.0;
    }
    inner_prod(a_idx, a_val, b_idx, b_val) / denom
}

/// Fraction of ground-truth top-k labels present in the predicted top-k,
/// averaged over all queries. Skips (with a warning) any query whose
/// ground-truth list is longer than the index's configured `topk`
/// (spec.md section 7, "Top-k-exceeds-stored-k").
pub fn recall_at_k(predicted: &QueryResult, ground_truth: &[Vec<u32>]) -> f32 {
    let mut total = 0.0f32;
    let mut counted = 0usize;

    for (q, truth) in ground_truth.iter().enumerate() {
        if truth.len() > predicted.k {
            log::warn!(
                "query {} requested eval_k={} exceeds configured topk={}, skipping",
                q,
                truth.len(),
                predicted.k
            );
            continue;
        }
        if truth.is_empty() {
            continue;
        }
        let row = predicted.row(q);
        let hits = truth.iter().filter(|label| row.contains(*label)).count();
        total += hits as f32 / truth.len() as f32;
        counted += 1;
    }

    if counted == 0 {
        0.0
    } else {
        total / counted as f32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cosine_sim_identical_vectors_is_one() {
        let sim = cosine_sim(&[1, 2, 3], &[1.0, 2.0, 3.0], &[1, 2, 3], &[1.0, 2.0, 3.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_sim_disjoint_vectors_is_zero() {
        let sim = cosine_sim(&[1, 2], &[1.0, 1.0], &[3, 4], &[1.0, 1.0]);
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_recall_at_k_full_hit() {
        let predicted = QueryResult::from_rows(
            vec![slash::LocalTopK { entries: vec![(5, 3), (9, 1)] }],
            2,
        );
        let recall = recall_at_k(&predicted, &[vec![5, 9]]);
        assert!((recall - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_recall_at_k_skips_oversized_ground_truth() {
        let predicted = QueryResult::from_rows(vec![slash::LocalTopK { entries: vec![(5, 3)] }], 1);
        let recall = recall_at_k(&predicted, &[vec![5, 9, 1]]);
        assert_eq!(recall, 0.0);
    }
}
