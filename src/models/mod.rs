//! Binary classifiers trained on the labeled feature table

pub mod boosting;
pub mod forest;
pub mod logistic;
pub mod tree;

use crate::types::{FeatureRow, ModelKind};
use std::fmt::Debug;

pub use boosting::{BoostingParams, GradientBoosting};
pub use forest::{ForestParams, RandomForest};
pub use logistic::{LogisticParams, LogisticRegression};

/// Probability above which a row is predicted as a good match
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Trait for trained, read-only predictors
pub trait Classifier: Send + Sync + Debug {
    fn kind(&self) -> ModelKind;

    /// Positive-class probability for one row
    fn predict_proba_row(&self, row: &FeatureRow) -> f64;

    fn predict_proba(&self, rows: &[FeatureRow]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_proba_row(row)).collect()
    }

    fn predict(&self, rows: &[FeatureRow]) -> Vec<u8> {
        rows.iter()
            .map(|row| u8::from(self.predict_proba_row(row) > DECISION_THRESHOLD))
            .collect()
    }
}

/// Inverse-frequency class weights: n / (classes_present * count_c).
/// Absent classes get weight 0.
pub fn balanced_class_weights(y: &[u8]) -> [f64; 2] {
    let positives = y.iter().filter(|&&v| v == 1).count();
    let counts = [y.len() - positives, positives];
    let present = counts.iter().filter(|&&c| c > 0).count();
    counts.map(|c| {
        if c == 0 {
            0.0
        } else {
            y.len() as f64 / (present as f64 * c as f64)
        }
    })
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
