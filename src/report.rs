//! Data behind the model comparison view; rendering happens elsewhere

use crate::ensemble::TrainingOutcome;
use crate::metrics::{roc_curve, RocPoint};
use crate::types::{ModelKind, QualityReportRow};
use serde::Serialize;

/// ROC curve of one model on the test partition
#[derive(Debug, Clone, Serialize)]
pub struct RocCurve {
    pub model: ModelKind,
    pub label: &'static str,
    pub auc: f64,
    pub points: Vec<RocPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelComparison {
    pub rows: Vec<QualityReportRow>,
    /// Highest Score_Total, first listed on ties
    pub best_model: Option<ModelKind>,
    pub roc_curves: Vec<RocCurve>,
}

impl ModelComparison {
    pub fn from_outcome(outcome: &TrainingOutcome) -> Self {
        let roc_curves = outcome
            .report
            .iter()
            .filter_map(|row| {
                let test = outcome.predictions.get(&row.model)?;
                Some(RocCurve {
                    model: row.model,
                    label: row.model.display_name(),
                    auc: row.roc_auc,
                    points: roc_curve(&outcome.y_test, &test.probabilities),
                })
            })
            .collect();
        Self {
            rows: outcome.report.clone(),
            best_model: outcome.best_model().map(|row| row.model),
            roc_curves,
        }
    }

    pub fn row(&self, model: ModelKind) -> Option<&QualityReportRow> {
        self.rows.iter().find(|r| r.model == model)
    }
}
