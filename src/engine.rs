//! Core MatchEngine: prepare, train, evaluate and rank in one pass

use crate::codes::display_labels;
use crate::config::EngineConfig;
use crate::ensemble::{train_models, TrainedEnsemble, TrainingOutcome};
use crate::error::{ConfigError, EntityKind, Result};
use crate::features::derive_feature_table;
use crate::preparation::{clean_candidates, prepare_training_table, ImputationReport, PreparedTable};
use crate::report::ModelComparison;
use crate::scoring::{aspect_scores, composite_score};
use crate::selection::{top_k_by, top_k_indices};
use crate::split::stratified_split;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// How caller-supplied weights are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightsUnit {
    #[default]
    Fraction,
    Percent,
}

/// One full matching run: history to train on, live candidates, one job
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRequest {
    /// Used both for training (joined through outcomes) and as the live pool
    pub candidates: RawTable,
    pub openings: RawTable,
    pub outcomes: RawTable,
    pub job: JobSpec,
    #[serde(default)]
    pub weights: Option<Weights>,
    #[serde(default)]
    pub weights_unit: WeightsUnit,
    #[serde(default)]
    pub penalties: Option<PenaltyFactors>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Ranked output for one job
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub top_k: usize,
    pub rows: Vec<RankedCandidate>,
    /// Each model's own top-K by predicted probability
    pub per_model_top: BTreeMap<ModelKind, Vec<ProbabilityEntry>>,
    pub candidates_scored: usize,
    pub imputation: ImputationReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchStats {
    pub training_rows: usize,
    pub positives: usize,
    pub negatives: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub candidates_scored: usize,
    pub imputed_values: usize,
    pub prepare_time_ms: u64,
    pub train_time_ms: u64,
    pub rank_time_ms: u64,
    pub total_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    pub report: ModelComparison,
    pub ranking: Ranking,
    pub stats: MatchStats,
}

/// Scoring parameters after boundary validation
#[derive(Debug, Clone, Copy)]
struct RankParams {
    weights: Weights,
    penalties: PenaltyFactors,
    top_k: usize,
}

/// Main match engine (thread-safe via Arc)
#[derive(Debug, Clone, Default)]
pub struct MatchEngine {
    config: EngineConfig,
}

pub type SharedMatchEngine = Arc<MatchEngine>;

impl MatchEngine {
    pub fn new(config: EngineConfig) -> SharedMatchEngine {
        Arc::new(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the labeled training table from the historical tables
    pub fn prepare(
        &self,
        candidates: &RawTable,
        openings: &RawTable,
        outcomes: &RawTable,
    ) -> Result<PreparedTable> {
        prepare_training_table(candidates, openings, outcomes)
    }

    /// Split the prepared table, then fit and evaluate all three models
    pub fn train(&self, prepared: &PreparedTable) -> Result<TrainingOutcome> {
        let x = prepared.feature_rows();
        let y = prepared.labels();
        let split = stratified_split(&y, self.config.test_fraction, self.config.seed)?;
        debug!(train = split.train.len(), test = split.test.len(), "split prepared table");
        let partition = split.materialize(&x, &y);
        Ok(train_models(&partition, &self.config))
    }

    /// Score every live candidate against `job` and keep the best `top_k`.
    ///
    /// The composite score is the ranking key. Model probabilities ride along
    /// for comparison and never change the order.
    pub fn rank(
        &self,
        ensemble: &TrainedEnsemble,
        candidates: &RawTable,
        job: &JobSpec,
        weights: &Weights,
        penalties: &PenaltyFactors,
        top_k: usize,
    ) -> Result<Ranking> {
        job.validate()?;
        weights.validate()?;
        penalties.validate()?;
        if top_k == 0 {
            return Err(ConfigError::ZeroTopK.into());
        }

        // A table without header or rows has nothing to score, not a missing schema
        if candidates.is_empty() && candidates.columns.is_empty() {
            debug!("empty live pool, nothing to rank");
            return Ok(Ranking {
                top_k,
                rows: Vec::new(),
                per_model_top: ModelKind::ALL
                    .into_iter()
                    .filter_map(|kind| ensemble.get(kind).map(|_| (kind, Vec::new())))
                    .collect(),
                candidates_scored: 0,
                imputation: ImputationReport::default(),
            });
        }

        let cleaned = clean_candidates(candidates)?;
        let pool = &cleaned.records;
        let features = derive_feature_table(pool.iter().map(|c| &c.attributes), &job.attributes());
        let rows: Vec<FeatureRow> = features.iter().map(FeatureVector::to_row).collect();
        let probabilities = ensemble.probabilities(&rows);

        let scores: Vec<AspectScores> = features.iter().map(|f| aspect_scores(f, penalties)).collect();
        let composites: Vec<f64> = scores.iter().map(|s| composite_score(s, weights)).collect();

        let ranked: Vec<RankedCandidate> = top_k_indices(&composites, top_k)
            .into_iter()
            .enumerate()
            .map(|(position, i)| RankedCandidate {
                rank: position + 1,
                id: pool[i].id.clone(),
                name: pool[i].name.clone(),
                labels: display_labels(&pool[i]),
                scores: scores[i],
                composite: composites[i],
                probabilities: probabilities[i],
            })
            .collect();

        let mut per_model_top = BTreeMap::new();
        for kind in ModelKind::ALL.into_iter().filter(|&k| ensemble.get(k).is_some()) {
            let entries: Vec<ProbabilityEntry> = pool
                .iter()
                .zip(&probabilities)
                .map(|(candidate, p)| ProbabilityEntry {
                    id: candidate.id.clone(),
                    name: candidate.name.clone(),
                    probability: p.get(kind),
                })
                .collect();
            per_model_top.insert(kind, top_k_by(entries, top_k, |e| e.probability));
        }

        if let Some(best) = ranked.first() {
            info!(
                "Ranked {} candidates, kept {}; best {} with composite {:.2}",
                pool.len(),
                ranked.len(),
                best.id,
                best.composite
            );
        }

        Ok(Ranking {
            top_k,
            rows: ranked,
            per_model_top,
            candidates_scored: pool.len(),
            imputation: cleaned.imputation,
        })
    }

    /// Main entry point: train on the history, then rank the candidates for one job
    pub fn run(&self, req: MatchRequest) -> Result<MatchResponse> {
        let start = Instant::now();
        let params = self.resolve(&req)?;
        info!(
            "Matching: {} candidates, {} openings, {} outcomes, top_k={}",
            req.candidates.len(),
            req.openings.len(),
            req.outcomes.len(),
            params.top_k
        );

        // Step 1: prepare the labeled training table
        let step = Instant::now();
        let prepared = self.prepare(&req.candidates, &req.openings, &req.outcomes)?;
        let prepare_time_ms = step.elapsed().as_millis() as u64;

        // Step 2: split, train, evaluate
        let step = Instant::now();
        let outcome = self.train(&prepared)?;
        let report = ModelComparison::from_outcome(&outcome);
        let train_time_ms = step.elapsed().as_millis() as u64;
        if let Some(best) = report.best_model.and_then(|kind| report.row(kind)) {
            info!(
                "Best model by Score_Total: {} ({:.3})",
                best.model, best.score_total
            );
        }

        // Step 3: rank the live pool
        let step = Instant::now();
        let ranking = self.rank(
            &outcome.ensemble,
            &req.candidates,
            &req.job,
            &params.weights,
            &params.penalties,
            params.top_k,
        )?;
        let rank_time_ms = step.elapsed().as_millis() as u64;

        // The live pool is the training candidate table, so its fills come from the ranking side only
        let imputed_values = prepared
            .imputation
            .iter()
            .filter(|(entity, _)| **entity != EntityKind::Candidates)
            .map(|(_, report)| report.total())
            .sum::<usize>()
            + ranking.imputation.total();
        let stats = MatchStats {
            training_rows: prepared.stats.total,
            positives: prepared.stats.positives,
            negatives: prepared.stats.negatives,
            train_rows: prepared.stats.total - outcome.y_test.len(),
            test_rows: outcome.y_test.len(),
            candidates_scored: ranking.candidates_scored,
            imputed_values,
            prepare_time_ms,
            train_time_ms,
            rank_time_ms,
            total_time_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Match complete: {} ranked rows in {} ms",
            ranking.rows.len(),
            stats.total_time_ms
        );

        Ok(MatchResponse {
            report,
            ranking,
            stats,
        })
    }

    /// Validate caller input once, before any training work
    fn resolve(&self, req: &MatchRequest) -> Result<RankParams> {
        req.job.validate()?;
        let weights = match (req.weights, req.weights_unit) {
            (None, _) => Weights::default(),
            (Some(w), WeightsUnit::Fraction) => {
                w.validate()?;
                w
            }
            (Some(w), WeightsUnit::Percent) => Weights::from_percentages(w)?,
        };
        let penalties = req.penalties.unwrap_or_default();
        penalties.validate()?;
        let top_k = req.top_k.unwrap_or(self.config.top_k);
        if top_k == 0 {
            return Err(ConfigError::ZeroTopK.into());
        }
        Ok(RankParams {
            weights,
            penalties,
            top_k,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;
    use serde_json::json;

    fn table(rows: Vec<serde_json::Value>) -> RawTable {
        serde_json::from_value(json!({ "rows": rows })).unwrap()
    }

    fn job() -> JobSpec {
        JobSpec {
            age_bracket_code: 2.0,
            education_level_code: 8.0,
            role_level_code: 3.0,
            area_code: 26.0,
            regime_code: 0.0,
            authority: 25.0,
            prestige: 25.0,
            security: 25.0,
            formality: 25.0,
        }
    }

    fn candidate(id: i64, area: i64, role: i64) -> serde_json::Value {
        json!({
            "id": id, "name": format!("C{id}"),
            "age_bracket_code": 2, "education_level_code": 8, "role_level_code": role,
            "area_code": area, "regime_code": 0,
            "authority": 25, "prestige": 25, "security": 25, "formality": 25
        })
    }

    #[test]
    fn rank_orders_by_composite_and_keeps_first_seen_on_ties() {
        let engine = MatchEngine::default();
        let pool = table(vec![
            candidate(1, 27, 3),
            candidate(2, 26, 3),
            candidate(3, 27, 3),
            candidate(4, 26, 5),
        ]);
        let ensemble = TrainedEnsemble::new(Vec::new());
        let ranking = engine
            .rank(&ensemble, &pool, &job(), &Weights::default(), &PenaltyFactors::default(), 3)
            .unwrap();
        let ids: Vec<&str> = ranking.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
        assert_eq!(ranking.rows[0].rank, 1);
        assert!((ranking.rows[0].composite - 100.0).abs() < 1e-9);
        assert_eq!(ranking.rows[0].labels.area.as_deref(), Some("Tecnologia"));
        assert_eq!(ranking.candidates_scored, 4);
        assert!(ranking.per_model_top.is_empty());
    }

    #[test]
    fn empty_pool_ranks_nothing() {
        let engine = MatchEngine::default();
        let ensemble = TrainedEnsemble::new(Vec::new());
        let ranking = engine
            .rank(
                &ensemble,
                &RawTable::from_rows(vec![]),
                &job(),
                &Weights::default(),
                &PenaltyFactors::default(),
                10,
            )
            .unwrap();
        assert!(ranking.rows.is_empty());
        assert_eq!(ranking.candidates_scored, 0);
        assert_eq!(ranking.imputation.total(), 0);

        // a declared header with missing fields is still a schema error
        let headed = RawTable { columns: vec!["id".into()], rows: vec![] };
        let err = engine
            .rank(&ensemble, &headed, &job(), &Weights::default(), &PenaltyFactors::default(), 10)
            .unwrap_err();
        assert!(matches!(err, MatchError::Schema { .. }));
    }

    #[test]
    fn rank_rejects_bad_parameters() {
        let engine = MatchEngine::default();
        let pool = table(vec![candidate(1, 26, 3)]);
        let ensemble = TrainedEnsemble::new(Vec::new());
        let err = engine
            .rank(&ensemble, &pool, &job(), &Weights::default(), &PenaltyFactors::default(), 0)
            .unwrap_err();
        assert!(matches!(err, MatchError::Config(ConfigError::ZeroTopK)));

        let mut skewed = job();
        skewed.formality = 60.0;
        let err = engine
            .rank(&ensemble, &pool, &skewed, &Weights::default(), &PenaltyFactors::default(), 5)
            .unwrap_err();
        assert!(matches!(err, MatchError::Config(ConfigError::ProfileSum { .. })));
    }

    #[test]
    fn percent_weights_are_converted() {
        let engine = MatchEngine::default();
        let req: MatchRequest = serde_json::from_value(json!({
            "candidates": { "rows": [] },
            "openings": { "rows": [] },
            "outcomes": { "rows": [] },
            "job": job(),
            "weights": { "area": 35, "profile": 30, "role_level": 20,
                         "education": 10, "age": 3, "regime": 2 },
            "weights_unit": "percent"
        }))
        .unwrap();
        let params = engine.resolve(&req).unwrap();
        assert!((params.weights.area - 0.35).abs() < 1e-12);
        assert_eq!(params.top_k, 10);
    }

    #[test]
    fn fraction_weights_must_sum_to_one() {
        let engine = MatchEngine::default();
        let mut req: MatchRequest = serde_json::from_value(json!({
            "candidates": { "rows": [] },
            "openings": { "rows": [] },
            "outcomes": { "rows": [] },
            "job": job()
        }))
        .unwrap();
        req.weights = Some(Weights { area: 0.9, ..Weights::default() });
        let err = engine.resolve(&req).unwrap_err();
        assert!(matches!(err, MatchError::Config(ConfigError::WeightsSum { .. })));
    }
}
