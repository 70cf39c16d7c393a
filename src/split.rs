//! Seeded, stratified train/test partitioning

use crate::error::{MatchError, Result};
use crate::rng::DetRng;
use crate::types::FeatureRow;
use tracing::warn;

/// Train and test partitions, materialized
#[derive(Debug, Clone)]
pub struct Partition {
    pub x_train: Vec<FeatureRow>,
    pub y_train: Vec<u8>,
    pub x_test: Vec<FeatureRow>,
    pub y_test: Vec<u8>,
}

/// Row indices of each side of a split, ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    pub fn materialize(&self, x: &[FeatureRow], y: &[u8]) -> Partition {
        Partition {
            x_train: self.train.iter().map(|&i| x[i]).collect(),
            y_train: self.train.iter().map(|&i| y[i]).collect(),
            x_test: self.test.iter().map(|&i| x[i]).collect(),
            y_test: self.test.iter().map(|&i| y[i]).collect(),
        }
    }
}

/// Number of test rows for `n` rows: ceil(n * fraction), kept within [1, n - 1]
pub fn test_size(n: usize, fraction: f64) -> usize {
    let raw = (n as f64 * fraction).ceil() as usize;
    raw.clamp(1, n.saturating_sub(1).max(1))
}

/// Stratified split. Degrades to an unstratified shuffle split when a class has
/// fewer than two rows, since stratification is then undefined.
pub fn stratified_split(labels: &[u8], fraction: f64, seed: u64) -> Result<SplitIndices> {
    let n = labels.len();
    if n < 2 {
        return Err(MatchError::InsufficientData { rows: n });
    }
    let n_test = test_size(n, fraction);
    let mut rng = DetRng::new(seed);

    let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, &label) in labels.iter().enumerate() {
        by_class[usize::from(label == 1)].push(i);
    }

    if by_class.iter().any(|c| c.len() < 2) {
        warn!(
            negatives = by_class[0].len(),
            positives = by_class[1].len(),
            "too few rows per class to stratify; using an unstratified split"
        );
        let mut all: Vec<usize> = (0..n).collect();
        rng.shuffle(&mut all);
        return Ok(finish(all[n_test..].to_vec(), all[..n_test].to_vec()));
    }

    let quotas = allocate_test_quotas([by_class[0].len(), by_class[1].len()], n_test);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (class, quota) in by_class.iter_mut().zip(quotas) {
        rng.shuffle(class);
        test.extend_from_slice(&class[..quota]);
        train.extend_from_slice(&class[quota..]);
    }
    Ok(finish(train, test))
}

fn finish(mut train: Vec<usize>, mut test: Vec<usize>) -> SplitIndices {
    train.sort_unstable();
    test.sort_unstable();
    SplitIndices { train, test }
}

/// Proportional per-class test counts. Floors first, remainder to the largest
/// fractional parts (lower label on ties), and every class keeps one training row.
fn allocate_test_quotas(counts: [usize; 2], n_test: usize) -> [usize; 2] {
    let n: usize = counts.iter().sum();
    let exact = counts.map(|c| n_test as f64 * c as f64 / n as f64);
    let mut quotas = exact.map(|e| e.floor() as usize);

    let mut remainder = n_test - quotas.iter().sum::<usize>();
    let mut order = [0usize, 1];
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    for &class in order.iter().cycle() {
        if remainder == 0 {
            break;
        }
        if quotas[class] < counts[class] - 1 {
            quotas[class] += 1;
            remainder -= 1;
        } else if quotas.iter().zip(counts).all(|(q, c)| *q >= c - 1) {
            break;
        }
    }

    for class in 0..2 {
        let cap = counts[class] - 1;
        if quotas[class] > cap {
            let overflow = quotas[class] - cap;
            quotas[class] = cap;
            let other = 1 - class;
            let room = (counts[other] - 1).saturating_sub(quotas[other]);
            quotas[other] += overflow.min(room);
        }
    }
    quotas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_is_ceiling_and_bounded() {
        assert_eq!(test_size(10, 0.2), 2);
        assert_eq!(test_size(11, 0.2), 3);
        assert_eq!(test_size(2, 0.2), 1);
        assert_eq!(test_size(3, 0.99), 2);
    }

    #[test]
    fn split_preserves_class_proportions() {
        let labels: Vec<u8> = (0..100).map(|i| u8::from(i % 4 == 0)).collect();
        let split = stratified_split(&labels, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let test_pos = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(test_pos, 5);
    }

    #[test]
    fn split_is_a_partition() {
        let labels: Vec<u8> = (0..37).map(|i| u8::from(i % 3 == 0)).collect();
        let split = stratified_split(&labels, 0.2, 42).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_reproducible() {
        let labels: Vec<u8> = (0..50).map(|i| u8::from(i % 2 == 0)).collect();
        assert_eq!(
            stratified_split(&labels, 0.2, 42).unwrap(),
            stratified_split(&labels, 0.2, 42).unwrap()
        );
    }

    #[test]
    fn single_class_falls_back_to_plain_split() {
        let labels = vec![0u8; 10];
        let split = stratified_split(&labels, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn fewer_than_two_rows_is_insufficient() {
        assert!(matches!(
            stratified_split(&[1], 0.2, 42),
            Err(MatchError::InsufficientData { rows: 1 })
        ));
    }

    #[test]
    fn each_class_keeps_a_training_row() {
        let quotas = allocate_test_quotas([8, 2], 9);
        assert!(quotas[1] <= 1);
        assert!(quotas[0] <= 7);
    }
}
