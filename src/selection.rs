//! Stable top-K selection

use std::cmp::Ordering;

/// Indices of the `k` largest keys, best first.
///
/// Exact ties keep input order, so the first-seen item wins a contested
/// last slot. Keys are compared with `total_cmp`; callers feed finite values.
pub fn top_k_indices(keys: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    // sort_by is stable
    order.sort_by(|&a, &b| descending(keys[a], keys[b]));
    order.truncate(k);
    order
}

/// The `k` items with the largest `key`, best first, ties in input order
pub fn top_k_by<T, F>(items: Vec<T>, k: usize, key: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    let keys: Vec<f64> = items.iter().map(&key).collect();
    let keep = top_k_indices(&keys, k);
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    keep.into_iter().filter_map(|i| slots[i].take()).collect()
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
