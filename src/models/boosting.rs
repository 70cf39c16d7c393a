//! Gradient-boosted trees on the logistic loss

use super::tree::{grow, DecisionTree, NodeStats, SplitCriterion, TreeParams};
use super::{sigmoid, Classifier};
use crate::rng::DetRng;
use crate::types::{FeatureRow, ModelKind, FEATURE_COUNT};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_rounds: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 regularization on leaf values
    pub lambda: f64,
    /// Minimum hessian mass per child
    pub min_child_weight: f64,
    /// Share of features each round may use
    pub colsample_bytree: f64,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            max_depth: 6,
            learning_rate: 0.1,
            lambda: 1.0,
            min_child_weight: 1.0,
            colsample_bytree: 1.0,
            seed: 42,
        }
    }
}

/// Positive-class weight `negatives / positives`; 1.0 without positives
pub fn scale_pos_weight(y: &[u8]) -> f64 {
    let positives = y.iter().filter(|&&v| v == 1).count();
    let negatives = y.len() - positives;
    if positives == 0 {
        1.0
    } else {
        negatives as f64 / positives as f64
    }
}

/// Second-order split gain on gradient/hessian sums
struct Newton<'a> {
    grad: &'a [f64],
    hess: &'a [f64],
    lambda: f64,
    min_child_weight: f64,
    learning_rate: f64,
}

impl Newton<'_> {
    fn score(&self, s: NodeStats) -> f64 {
        s.sum * s.sum / (s.weight + self.lambda)
    }
}

impl SplitCriterion for Newton<'_> {
    fn sample_stats(&self, sample: usize) -> NodeStats {
        NodeStats {
            sum: self.grad[sample],
            weight: self.hess[sample],
        }
    }

    fn gain(&self, parent: NodeStats, left: NodeStats, right: NodeStats) -> Option<f64> {
        if left.weight < self.min_child_weight || right.weight < self.min_child_weight {
            return None;
        }
        Some(0.5 * (self.score(left) + self.score(right) - self.score(parent)))
    }

    fn leaf_value(&self, stats: NodeStats) -> f64 {
        -stats.sum / (stats.weight + self.lambda) * self.learning_rate
    }
}

#[derive(Debug, Clone)]
pub struct GradientBoosting {
    base_margin: f64,
    scale_pos_weight: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoosting {
    pub fn fit(x: &[FeatureRow], y: &[u8], params: &BoostingParams) -> Self {
        let n = x.len();
        let spw = scale_pos_weight(y);
        let sample_weight: Vec<f64> = y.iter().map(|&v| if v == 1 { spw } else { 1.0 }).collect();
        let mut rng = DetRng::new(params.seed);

        // base score 0.5
        let base_margin = 0.0;
        let mut margins = vec![base_margin; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_rounds);

        for _ in 0..params.n_rounds {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad[i] = sample_weight[i] * (p - f64::from(y[i]));
                hess[i] = (sample_weight[i] * p * (1.0 - p)).max(1e-16);
            }

            let criterion = Newton {
                grad: &grad,
                hess: &hess,
                lambda: params.lambda,
                min_child_weight: params.min_child_weight,
                learning_rate: params.learning_rate,
            };
            let tree_params = TreeParams {
                max_depth: params.max_depth,
                min_samples_split: 2,
                max_features: None,
                allowed_features: column_sample(params.colsample_bytree, &mut rng),
                parallel_split_search: true,
            };
            let tree = grow(x, (0..n).collect(), &criterion, &tree_params, &mut rng);

            for (margin, row) in margins.iter_mut().zip(x) {
                *margin += tree.predict(row);
            }
            trees.push(tree);
        }

        Self {
            base_margin,
            scale_pos_weight: spw,
            trees,
        }
    }

    pub fn scale_pos_weight(&self) -> f64 {
        self.scale_pos_weight
    }

    fn margin(&self, row: &FeatureRow) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }
}

fn column_sample(share: f64, rng: &mut DetRng) -> Option<Vec<usize>> {
    if share >= 1.0 {
        return None;
    }
    let k = ((FEATURE_COUNT as f64 * share).round() as usize).clamp(1, FEATURE_COUNT);
    let mut picked = rng.sample_indices(FEATURE_COUNT, k);
    picked.sort_unstable();
    Some(picked)
}

impl Classifier for GradientBoosting {
    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoosting
    }

    fn predict_proba_row(&self, row: &FeatureRow) -> f64 {
        sigmoid(self.margin(row))
    }
}
