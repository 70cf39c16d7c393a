//! Bagged Gini trees with class-balanced weights

use super::tree::{grow, DecisionTree, NodeStats, SplitCriterion, TreeParams};
use super::{balanced_class_weights, Classifier};
use crate::rng::DetRng;
use crate::types::{FeatureRow, ModelKind, FEATURE_COUNT};
use rayon::prelude::*;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    /// Features tried per split; `None` = floor(sqrt(feature count))
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            max_features: None,
            seed: 42,
        }
    }
}

/// Weighted Gini impurity decrease
struct Gini<'a> {
    y: &'a [u8],
    weights: &'a [f64],
}

fn gini_mass(s: NodeStats) -> f64 {
    if s.weight <= 0.0 {
        return 0.0;
    }
    let p = s.sum / s.weight;
    s.weight * (1.0 - p * p - (1.0 - p) * (1.0 - p))
}

impl SplitCriterion for Gini<'_> {
    fn sample_stats(&self, sample: usize) -> NodeStats {
        let w = self.weights[sample];
        NodeStats {
            sum: w * f64::from(self.y[sample]),
            weight: w,
        }
    }

    fn gain(&self, parent: NodeStats, left: NodeStats, right: NodeStats) -> Option<f64> {
        if left.weight <= 0.0 || right.weight <= 0.0 {
            return None;
        }
        Some(gini_mass(parent) - gini_mass(left) - gini_mass(right))
    }

    fn leaf_value(&self, stats: NodeStats) -> f64 {
        if stats.weight <= 0.0 {
            0.0
        } else {
            stats.sum / stats.weight
        }
    }

    fn is_pure(&self, stats: NodeStats) -> bool {
        let eps = 1e-12 * stats.weight.max(1.0);
        stats.sum <= eps || stats.sum >= stats.weight - eps
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit trees in parallel. Tree `t` draws from its own stream of (seed, t),
    /// so the forest is identical for any thread count.
    pub fn fit(x: &[FeatureRow], y: &[u8], params: &ForestParams) -> Self {
        let n = x.len();
        let class_weights = balanced_class_weights(y);
        let max_features = params
            .max_features
            .unwrap_or_else(|| ((FEATURE_COUNT as f64).sqrt() as usize).max(1));
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: 2,
            max_features: Some(max_features),
            allowed_features: None,
            parallel_split_search: false,
        };

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = DetRng::derive(params.seed, t as u64);
                let mut counts = vec![0u32; n];
                for _ in 0..n {
                    counts[rng.below(n)] += 1;
                }
                let weights: Vec<f64> = counts
                    .iter()
                    .zip(y)
                    .map(|(&c, &label)| class_weights[usize::from(label == 1)] * f64::from(c))
                    .collect();
                let samples: Vec<usize> = (0..n).filter(|&i| counts[i] > 0).collect();
                let criterion = Gini { y, weights: &weights };
                grow(x, samples, &criterion, &tree_params, &mut rng)
            })
            .collect();

        Self { trees }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }

    fn predict_proba_row(&self, row: &FeatureRow) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }
}
