//! Training and held-out evaluation of the three classifiers

use crate::config::EngineConfig;
use crate::metrics;
use crate::models::{
    boosting::scale_pos_weight, Classifier, GradientBoosting, LogisticRegression, RandomForest,
};
use crate::split::Partition;
use crate::types::{FeatureRow, ModelKind, ModelProbabilities, QualityReportRow};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// ROC-AUC reported when the test partition holds a single class
pub const UNDEFINED_AUC: f64 = 0.5;

/// Read-only trained predictors of one training run
#[derive(Debug)]
pub struct TrainedEnsemble {
    models: Vec<Box<dyn Classifier>>,
}

/// Shared across concurrent scoring calls
pub type SharedEnsemble = Arc<TrainedEnsemble>;

impl TrainedEnsemble {
    pub fn new(models: Vec<Box<dyn Classifier>>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> impl Iterator<Item = &dyn Classifier> {
        self.models.iter().map(|m| m.as_ref())
    }

    pub fn get(&self, kind: ModelKind) -> Option<&dyn Classifier> {
        self.models().find(|m| m.kind() == kind)
    }

    /// Every model's positive-class probability for every row
    pub fn probabilities(&self, rows: &[FeatureRow]) -> Vec<ModelProbabilities> {
        let mut out = vec![ModelProbabilities::default(); rows.len()];
        for model in self.models() {
            for (slot, p) in out.iter_mut().zip(model.predict_proba(rows)) {
                slot.set(model.kind(), p);
            }
        }
        out
    }
}

/// Hard labels and probabilities of one model on the test partition
#[derive(Debug, Clone)]
pub struct TestPredictions {
    pub labels: Vec<u8>,
    pub probabilities: Vec<f64>,
}

/// Result of one training run
#[derive(Debug)]
pub struct TrainingOutcome {
    pub ensemble: SharedEnsemble,
    pub report: Vec<QualityReportRow>,
    pub predictions: BTreeMap<ModelKind, TestPredictions>,
    pub y_test: Vec<u8>,
}

impl TrainingOutcome {
    /// Model with the highest Score_Total (first listed wins ties)
    pub fn best_model(&self) -> Option<&QualityReportRow> {
        self.report.iter().fold(None, |best, row| match best {
            Some(b) if b.score_total >= row.score_total => Some(b),
            _ => Some(row),
        })
    }
}

/// Evaluate one model's test predictions
pub fn evaluate(kind: ModelKind, y_test: &[u8], predictions: &TestPredictions) -> QualityReportRow {
    let accuracy = metrics::accuracy(y_test, &predictions.labels);
    let precision = metrics::precision(y_test, &predictions.labels);
    let recall = metrics::recall(y_test, &predictions.labels);
    let f1 = metrics::f1(y_test, &predictions.labels);
    let roc_auc = metrics::roc_auc(y_test, &predictions.probabilities).unwrap_or_else(|| {
        warn!(model = %kind, "ROC-AUC undefined on a single-class test partition; reporting {UNDEFINED_AUC}");
        UNDEFINED_AUC
    });
    QualityReportRow {
        model: kind,
        accuracy,
        precision,
        recall,
        f1,
        roc_auc,
        score_total: (accuracy + f1 + roc_auc) / 3.0,
    }
}

/// Train all three models on the same partition and evaluate them on its test side
pub fn train_models(partition: &Partition, config: &EngineConfig) -> TrainingOutcome {
    let x = &partition.x_train;
    let y = &partition.y_train;
    let positives = y.iter().filter(|&&v| v == 1).count();
    if positives == 0 || positives == y.len() {
        warn!(
            rows = y.len(),
            positives,
            "training partition holds a single class; models will predict a constant"
        );
    }
    info!(
        "Training on {} rows ({} positive), evaluating on {} rows, scale_pos_weight={:.3}",
        y.len(),
        positives,
        partition.y_test.len(),
        scale_pos_weight(y)
    );

    let mut models: Vec<Box<dyn Classifier>> = Vec::with_capacity(ModelKind::ALL.len());
    let mut report = Vec::with_capacity(ModelKind::ALL.len());
    let mut predictions = BTreeMap::new();

    for kind in ModelKind::ALL {
        let start = Instant::now();
        let model: Box<dyn Classifier> = match kind {
            ModelKind::LogisticRegression => Box::new(LogisticRegression::fit(x, y, &config.logistic)),
            ModelKind::RandomForest => Box::new(RandomForest::fit(x, y, &config.forest)),
            ModelKind::GradientBoosting => Box::new(GradientBoosting::fit(x, y, &config.boosting)),
        };
        let test = TestPredictions {
            labels: model.predict(&partition.x_test),
            probabilities: model.predict_proba(&partition.x_test),
        };
        let row = evaluate(kind, &partition.y_test, &test);
        info!(
            "{}: accuracy={:.3} f1={:.3} roc_auc={:.3} score_total={:.3} ({} ms)",
            kind,
            row.accuracy,
            row.f1,
            row.roc_auc,
            row.score_total,
            start.elapsed().as_millis()
        );
        report.push(row);
        predictions.insert(kind, test);
        models.push(model);
    }

    TrainingOutcome {
        ensemble: Arc::new(TrainedEnsemble::new(models)),
        report,
        predictions,
        y_test: partition.y_test.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FEATURE_COUNT;

    fn partition() -> Partition {
        let make = |range: std::ops::Range<usize>| -> (Vec<FeatureRow>, Vec<u8>) {
            range
                .map(|i| {
                    let good = i % 3 == 0;
                    let mut row = [0.0; FEATURE_COUNT];
                    for (f, cell) in row.iter_mut().enumerate() {
                        *cell = if good { 0.5 } else { 4.0 } + ((i + f) % 4) as f64 * 0.25;
                    }
                    (row, u8::from(good))
                })
                .unzip()
        };
        let (x_train, y_train) = make(0..48);
        let (x_test, y_test) = make(48..60);
        Partition { x_train, y_train, x_test, y_test }
    }

    fn small_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.forest.n_trees = 15;
        config.boosting.n_rounds = 30;
        config
    }

    #[test]
    fn report_has_one_row_per_model_in_order() {
        let outcome = train_models(&partition(), &small_config());
        let kinds: Vec<ModelKind> = outcome.report.iter().map(|r| r.model).collect();
        assert_eq!(kinds, ModelKind::ALL.to_vec());
        for row in &outcome.report {
            assert!((row.score_total - (row.accuracy + row.f1 + row.roc_auc) / 3.0).abs() < 1e-12);
            assert_eq!(row.accuracy, 1.0, "{} should separate the data", row.model);
        }
        assert_eq!(outcome.predictions.len(), 3);
        assert!(outcome.best_model().is_some());
    }

    #[test]
    fn single_class_test_partition_reports_neutral_auc() {
        let mut p = partition();
        p.x_test.truncate(1);
        p.y_test.truncate(1);
        let outcome = train_models(&p, &small_config());
        assert!(outcome.report.iter().all(|r| r.roc_auc == UNDEFINED_AUC));
    }

    #[test]
    fn ensemble_probabilities_fill_every_model() {
        let p = partition();
        let outcome = train_models(&p, &small_config());
        let probs = outcome.ensemble.probabilities(&p.x_test);
        assert_eq!(probs.len(), p.x_test.len());
        assert!(probs[0].logistic_regression > 0.5);
        assert!(probs[0].random_forest > 0.5);
        assert!(probs[0].gradient_boosting > 0.5);
    }

    #[test]
    fn training_is_reproducible() {
        let p = partition();
        let a = train_models(&p, &small_config());
        let b = train_models(&p, &small_config());
        assert_eq!(a.report, b.report);
    }
}
