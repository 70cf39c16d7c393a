//! Standardized, class-balanced, L2-regularized logistic regression

use super::{balanced_class_weights, sigmoid, Classifier};
use crate::types::{FeatureRow, ModelKind, FEATURE_COUNT};
use serde::Deserialize;

/// Coefficients plus intercept
const DIM: usize = FEATURE_COUNT + 1;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

/// Zero-mean, unit-variance scaling fit on training rows only
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    mean: FeatureRow,
    scale: FeatureRow,
}

impl Standardizer {
    pub fn fit(x: &[FeatureRow]) -> Self {
        let n = x.len().max(1) as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        for row in x {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let mut scale = [0.0; FEATURE_COUNT];
        for row in x {
            for f in 0..FEATURE_COUNT {
                scale[f] += (row[f] - mean[f]).powi(2) / n;
            }
        }
        for s in scale.iter_mut() {
            *s = s.sqrt();
            // constant columns are left unscaled
            if *s < 1e-12 {
                *s = 1.0;
            }
        }
        Self { mean, scale }
    }

    pub fn transform(&self, row: &FeatureRow) -> FeatureRow {
        let mut out = [0.0; FEATURE_COUNT];
        for f in 0..FEATURE_COUNT {
            out[f] = (row[f] - self.mean[f]) / self.scale[f];
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    scaler: Standardizer,
    coef: FeatureRow,
    intercept: f64,
    iterations: usize,
}

fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

fn margin(theta: &[f64; DIM], z: &FeatureRow) -> f64 {
    theta[FEATURE_COUNT] + z.iter().zip(theta.iter()).map(|(a, b)| a * b).sum::<f64>()
}

impl LogisticRegression {
    /// Damped Newton iterations on 0.5·|w|² + C·Σ wᵢ·logloss, intercept unpenalized
    pub fn fit(x: &[FeatureRow], y: &[u8], params: &LogisticParams) -> Self {
        let scaler = Standardizer::fit(x);
        let z: Vec<FeatureRow> = x.iter().map(|row| scaler.transform(row)).collect();
        let class_weights = balanced_class_weights(y);
        let sw: Vec<f64> = y.iter().map(|&v| class_weights[usize::from(v == 1)]).collect();

        let objective = |theta: &[f64; DIM]| -> f64 {
            let penalty: f64 = theta[..FEATURE_COUNT].iter().map(|w| w * w).sum::<f64>() * 0.5;
            let loss: f64 = z
                .iter()
                .zip(y)
                .zip(&sw)
                .map(|((row, &label), w)| {
                    let m = margin(theta, row);
                    w * (softplus(m) - f64::from(label) * m)
                })
                .sum();
            penalty + params.c * loss
        };

        let mut theta = [0.0; DIM];
        let mut current = objective(&theta);
        let mut iterations = 0;

        while iterations < params.max_iter {
            iterations += 1;
            let mut grad = [0.0; DIM];
            let mut hess = [[0.0; DIM]; DIM];
            for f in 0..FEATURE_COUNT {
                grad[f] = theta[f];
                hess[f][f] = 1.0;
            }
            for ((row, &label), w) in z.iter().zip(y).zip(&sw) {
                let p = sigmoid(margin(&theta, row));
                let r = params.c * w * (p - f64::from(label));
                let h = params.c * w * p * (1.0 - p);
                let ext = extend(row);
                for i in 0..DIM {
                    grad[i] += r * ext[i];
                    for j in 0..DIM {
                        hess[i][j] += h * ext[i] * ext[j];
                    }
                }
            }
            for (i, row) in hess.iter_mut().enumerate() {
                row[i] += 1e-10;
            }

            let Some(step) = solve(hess, grad) else {
                break;
            };

            let mut t = 1.0;
            let mut candidate = theta;
            let mut next = current;
            while t > 1e-10 {
                for i in 0..DIM {
                    candidate[i] = theta[i] - t * step[i];
                }
                next = objective(&candidate);
                if next <= current {
                    break;
                }
                t *= 0.5;
            }
            if next > current {
                break;
            }

            let moved = step.iter().map(|s| (s * t).abs()).fold(0.0, f64::max);
            theta = candidate;
            current = next;
            if moved < params.tol {
                break;
            }
        }

        let mut coef = [0.0; FEATURE_COUNT];
        coef.copy_from_slice(&theta[..FEATURE_COUNT]);
        Self {
            scaler,
            coef,
            intercept: theta[FEATURE_COUNT],
            iterations,
        }
    }

    pub fn coefficients(&self) -> &FeatureRow {
        &self.coef
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

fn extend(row: &FeatureRow) -> [f64; DIM] {
    let mut out = [1.0; DIM];
    out[..FEATURE_COUNT].copy_from_slice(row);
    out
}

/// Gaussian elimination with partial pivoting; `None` if singular
fn solve(mut a: [[f64; DIM]; DIM], mut b: [f64; DIM]) -> Option<[f64; DIM]> {
    for col in 0..DIM {
        let pivot = (col..DIM).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..DIM {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..DIM {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0; DIM];
    for row in (0..DIM).rev() {
        let tail: f64 = (row + 1..DIM).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> ModelKind {
        ModelKind::LogisticRegression
    }

    fn predict_proba_row(&self, row: &FeatureRow) -> f64 {
        let z = self.scaler.transform(row);
        let m = self.intercept + z.iter().zip(&self.coef).map(|(a, b)| a * b).sum::<f64>();
        sigmoid(m)
    }
}
