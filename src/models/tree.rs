//! CART tree shared by the forest and the boosted model

use crate::rng::DetRng;
use crate::types::{FeatureRow, FEATURE_COUNT};
use rayon::prelude::*;

/// Minimum improvement for a split to be kept
const MIN_GAIN: f64 = 1e-12;

/// Additive node statistics. For Gini trees: weighted positives / total weight.
/// For boosting trees: gradient sum / hessian sum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeStats {
    pub sum: f64,
    pub weight: f64,
}

impl NodeStats {
    fn add(&mut self, other: NodeStats) {
        self.sum += other.sum;
        self.weight += other.weight;
    }

    fn minus(&self, other: NodeStats) -> NodeStats {
        NodeStats {
            sum: self.sum - other.sum,
            weight: self.weight - other.weight,
        }
    }
}

/// How a tree scores splits and values leaves
pub trait SplitCriterion: Sync {
    fn sample_stats(&self, sample: usize) -> NodeStats;

    /// Improvement of splitting `parent` into `left`/`right`; `None` if inadmissible
    fn gain(&self, parent: NodeStats, left: NodeStats, right: NodeStats) -> Option<f64>;

    fn leaf_value(&self, stats: NodeStats) -> f64;

    fn is_pure(&self, _stats: NodeStats) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features drawn per node (without replacement); `None` = all allowed features
    pub max_features: Option<usize>,
    /// Features this tree may use; `None` = all
    pub allowed_features: Option<Vec<usize>>,
    /// Search candidate features in parallel. Results are reduced in feature order.
    pub parallel_split_search: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree; rows with `x[feature] <= threshold` go left
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn predict(&self, row: &FeatureRow) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Grow a tree over `samples` (indices into `x`)
pub fn grow<C: SplitCriterion>(
    x: &[FeatureRow],
    samples: Vec<usize>,
    criterion: &C,
    params: &TreeParams,
    rng: &mut DetRng,
) -> DecisionTree {
    let mut builder = Builder {
        x,
        criterion,
        params,
        rng,
        nodes: Vec::new(),
    };
    builder.build(samples, 0);
    DecisionTree {
        nodes: builder.nodes,
    }
}

struct Builder<'a, C> {
    x: &'a [FeatureRow],
    criterion: &'a C,
    params: &'a TreeParams,
    rng: &'a mut DetRng,
    nodes: Vec<Node>,
}

impl<C: SplitCriterion> Builder<'_, C> {
    fn build(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let stats = samples.iter().fold(NodeStats::default(), |mut acc, &s| {
            acc.add(self.criterion.sample_stats(s));
            acc
        });
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.criterion.leaf_value(stats),
        });

        if depth >= self.params.max_depth
            || samples.len() < self.params.min_samples_split.max(2)
            || self.criterion.is_pure(stats)
        {
            return idx;
        }

        let features = self.candidate_features();
        let Some(best) = self.best_split(&samples, stats, &features) else {
            return idx;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&s| self.x[s][best.feature] <= best.threshold);
        if left.is_empty() || right.is_empty() {
            return idx;
        }

        let left_idx = self.build(left, depth + 1);
        let right_idx = self.build(right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: left_idx,
            right: right_idx,
        };
        idx
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let pool: Vec<usize> = match &self.params.allowed_features {
            Some(allowed) => allowed.clone(),
            None => (0..FEATURE_COUNT).collect(),
        };
        match self.params.max_features {
            Some(k) if k < pool.len() => self
                .rng
                .sample_indices(pool.len(), k.max(1))
                .into_iter()
                .map(|i| pool[i])
                .collect(),
            _ => pool,
        }
    }

    fn best_split(
        &self,
        samples: &[usize],
        parent: NodeStats,
        features: &[usize],
    ) -> Option<SplitCandidate> {
        let search = |&feature: &usize| scan_feature(self.x, samples, parent, feature, self.criterion);
        let per_feature: Vec<Option<SplitCandidate>> = if self.params.parallel_split_search {
            features.par_iter().map(search).collect()
        } else {
            features.iter().map(search).collect()
        };

        // first feature wins on equal gain, independent of thread scheduling
        per_feature
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitCandidate>, cand| match best {
                Some(b) if b.gain >= cand.gain => Some(b),
                _ => Some(cand),
            })
    }
}

/// Best threshold on one feature, sweeping sorted values left to right
fn scan_feature<C: SplitCriterion>(
    x: &[FeatureRow],
    samples: &[usize],
    parent: NodeStats,
    feature: usize,
    criterion: &C,
) -> Option<SplitCandidate> {
    let mut order: Vec<usize> = samples.to_vec();
    order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

    let mut left = NodeStats::default();
    let mut best: Option<SplitCandidate> = None;
    for i in 0..order.len() - 1 {
        left.add(criterion.sample_stats(order[i]));
        let lo = x[order[i]][feature];
        let hi = x[order[i + 1]][feature];
        if lo >= hi {
            continue;
        }
        let right = parent.minus(left);
        let Some(gain) = criterion.gain(parent, left, right) else {
            continue;
        };
        if gain <= MIN_GAIN || best.is_some_and(|b| b.gain >= gain) {
            continue;
        }
        let mut threshold = lo + (hi - lo) / 2.0;
        if threshold >= hi {
            threshold = lo;
        }
        best = Some(SplitCandidate {
            feature,
            threshold,
            gain,
        });
    }
    best
}
