//! Scenario tests for MatchEngine and the HTTP router

use crate::engine::MatchRequest;
use crate::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

const AREAS: [i64; 4] = [26, 27, 33, 8];

/// Helper to create a raw table from JSON rows
fn table(rows: Vec<Value>) -> RawTable {
    let rows = rows
        .into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();
    RawTable::from_rows(rows)
}

fn mock_candidate(id: i64) -> Value {
    let i = id as usize;
    json!({
        "id": id,
        "name": format!("Candidate {id}"),
        "age_bracket_code": i % 7,
        "education_level_code": 4 + i % 6,
        "role_level_code": 1 + i % 5,
        "area_code": AREAS[i % AREAS.len()],
        "regime_code": i % 3,
        "authority": 10 + (i % 4) * 10,
        "prestige": 40 - (i % 4) * 10,
        "security": 25,
        "formality": 25
    })
}

fn mock_opening(id: i64, area: i64, role: i64) -> Value {
    json!({
        "opening_id": id,
        "age_bracket_code": 3,
        "education_level_code": 8,
        "role_level_code": role,
        "area_code": area,
        "regime_code": 1,
        "authority": 25,
        "prestige": 25,
        "security": 25,
        "formality": 25
    })
}

/// Good match when the areas agree and the role levels are at most one apart
fn mock_history() -> (RawTable, RawTable, RawTable) {
    let openings = [(101, 26, 3), (102, 33, 2), (103, 8, 4)];
    let candidates: Vec<Value> = (1..=40).map(mock_candidate).collect();
    let mut outcomes = Vec::new();
    for id in 1..=40i64 {
        let i = id as usize;
        let area = AREAS[i % AREAS.len()];
        let role = 1 + (i % 5) as i64;
        for &(opening, o_area, o_role) in &openings {
            let good = area == o_area && (role - o_role).abs() <= 1;
            outcomes.push(json!({
                "opening_id": opening,
                "candidate_id": id,
                "match": u8::from(good)
            }));
        }
    }
    let openings = openings
        .iter()
        .map(|&(id, area, role)| mock_opening(id, area, role))
        .collect();
    (table(candidates), table(openings), table(outcomes))
}

fn mock_job() -> JobSpec {
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

/// Smaller ensembles keep the suite fast; structure is unchanged
fn test_engine() -> SharedMatchEngine {
    let mut config = EngineConfig::default();
    config.forest.n_trees = 25;
    config.boosting.n_rounds = 40;
    MatchEngine::new(config)
}

fn mock_request() -> MatchRequest {
    let (candidates, openings, outcomes) = mock_history();
    MatchRequest {
        candidates,
        openings,
        outcomes,
        job: mock_job(),
        weights: None,
        weights_unit: WeightsUnit::Fraction,
        penalties: None,
        top_k: None,
    }
}

#[test]
fn test_perfect_candidate_scores_one_hundred() {
    let engine = test_engine();
    let (candidates, openings, outcomes) = mock_history();
    let prepared = engine.prepare(&candidates, &openings, &outcomes).unwrap();
    let outcome = engine.train(&prepared).unwrap();

    let pool = table(vec![json!({
        "id": 1, "area_code": 26, "role_level_code": 3, "education_level_code": 8,
        "age_bracket_code": 2, "regime_code": 0,
        "authority": 25, "prestige": 25, "security": 25, "formality": 25
    })]);
    let job = mock_job();
    let ranking = engine
        .rank(
            &outcome.ensemble,
            &pool,
            &job,
            &Weights::default(),
            &PenaltyFactors::default(),
            10,
        )
        .unwrap();

    assert_eq!(ranking.rows.len(), 1);
    let row = &ranking.rows[0];
    for aspect in Aspect::ALL {
        assert_eq!(row.scores.get(aspect), 100.0, "aspect {aspect}");
    }
    assert!((row.composite - 100.0).abs() < 1e-9);

    let features = derive_features(&job.attributes(), &job.attributes());
    assert_eq!(features.profile_distance, 0.0);
}

#[test]
fn test_end_to_end_match() {
    let engine = test_engine();
    let response = engine.run(mock_request()).unwrap();

    assert_eq!(response.report.rows.len(), 3);
    assert!(response.report.best_model.is_some());
    assert_eq!(response.ranking.rows.len(), 10);
    assert_eq!(response.ranking.per_model_top.len(), 3);
    for list in response.ranking.per_model_top.values() {
        assert_eq!(list.len(), 10);
        assert!(list.windows(2).all(|w| w[0].probability >= w[1].probability));
    }

    assert_eq!(response.stats.training_rows, 120);
    assert_eq!(response.stats.test_rows, 24);
    assert_eq!(response.stats.train_rows, 96);
    assert_eq!(response.stats.candidates_scored, 40);

    for (i, row) in response.ranking.rows.iter().enumerate() {
        assert_eq!(row.rank, i + 1);
        assert!((0.0..=100.0).contains(&row.composite));
    }
    // areas 26 and 27 dominate the composite for an area-26 job
    assert_eq!(response.ranking.rows[0].labels.area_cluster.as_deref(), Some("Tecnologia"));
}

#[test]
fn test_top_k_is_a_partial_sort() {
    let engine = test_engine();
    let req = mock_request();
    let pool = req.candidates.clone();
    let prepared = engine.prepare(&req.candidates, &req.openings, &req.outcomes).unwrap();
    let outcome = engine.train(&prepared).unwrap();
    let everything = engine
        .rank(&outcome.ensemble, &pool, &req.job, &Weights::default(), &PenaltyFactors::default(), 40)
        .unwrap();
    let top = engine
        .rank(&outcome.ensemble, &pool, &req.job, &Weights::default(), &PenaltyFactors::default(), 5)
        .unwrap();

    let kept: Vec<&str> = top.rows.iter().map(|r| r.id.as_str()).collect();
    let floor = top.rows.iter().map(|r| r.composite).fold(f64::INFINITY, f64::min);
    for row in everything.rows.iter().filter(|r| !kept.contains(&r.id.as_str())) {
        assert!(row.composite <= floor);
    }
    // the short list is a prefix of the full one
    let prefix: Vec<&str> = everything.rows[..5].iter().map(|r| r.id.as_str()).collect();
    assert_eq!(kept, prefix);
}

#[test]
fn test_ranking_is_idempotent() {
    let engine = test_engine();
    let req = mock_request();
    let prepared = engine.prepare(&req.candidates, &req.openings, &req.outcomes).unwrap();
    let outcome = engine.train(&prepared).unwrap();
    let rank = || {
        engine
            .rank(
                &outcome.ensemble,
                &req.candidates,
                &req.job,
                &Weights::default(),
                &PenaltyFactors::default(),
                10,
            )
            .unwrap()
    };
    let a = rank();
    let b = rank();
    let key = |r: &Ranking| -> Vec<(String, f64, f64)> {
        r.rows
            .iter()
            .map(|row| (row.id.clone(), row.composite, row.probabilities.random_forest))
            .collect()
    };
    assert_eq!(key(&a), key(&b));
}

#[test]
fn test_training_is_deterministic() {
    let engine = test_engine();
    let a = engine.run(mock_request()).unwrap();
    let b = engine.run(mock_request()).unwrap();
    assert_eq!(a.report.rows, b.report.rows);
    let ids = |r: &MatchResponse| -> Vec<String> { r.ranking.rows.iter().map(|x| x.id.clone()).collect() };
    assert_eq!(ids(&a), ids(&b));
}

#[test]
fn test_missing_behavioral_value_is_neutral() {
    let engine = test_engine();
    let pool = table(vec![
        json!({
            "id": "a", "area_code": 26, "role_level_code": 3, "education_level_code": 8,
            "age_bracket_code": 2, "regime_code": 0,
            "authority": null, "prestige": 25, "security": 25, "formality": 25
        }),
        json!({
            "id": "b", "area_code": 26, "role_level_code": 3, "education_level_code": 8,
            "age_bracket_code": 2, "regime_code": 0,
            "authority": 70, "prestige": 10, "security": 10, "formality": 10
        }),
    ]);
    let ensemble = TrainedEnsemble::new(Vec::new());
    let ranking = engine
        .rank(&ensemble, &pool, &mock_job(), &Weights::default(), &PenaltyFactors::default(), 2)
        .unwrap();

    assert_eq!(ranking.rows[0].id, "a");
    assert_eq!(ranking.rows[0].scores.profile, 100.0);
    assert_eq!(ranking.imputation.counts.get("authority"), Some(&1));
}

#[test]
fn test_imputed_values_count_each_cell_once() {
    let engine = test_engine();
    let mut req = mock_request();
    req.candidates.rows[0].remove("authority");
    let response = engine.run(req).unwrap();

    assert_eq!(response.ranking.imputation.total(), 1);
    assert_eq!(response.stats.imputed_values, 1);
}

#[test]
fn test_disjoint_history_is_an_empty_join() {
    let engine = test_engine();
    let candidates = table((991..=995).map(mock_candidate).collect());
    let openings = table(vec![mock_opening(101, 26, 3)]);
    let outcomes = table(vec![json!({ "opening_id": 101, "candidate_id": 1, "match": 1 })]);
    let err = engine.prepare(&candidates, &openings, &outcomes).unwrap_err();
    assert!(matches!(err, MatchError::EmptyJoin { candidates: 5, .. }));
}

async fn post_match(body: Value) -> (StatusCode, Value) {
    let app = server::create_router(test_engine());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/match")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn request_json() -> Value {
    let req = mock_request();
    json!({
        "candidates": req.candidates,
        "openings": req.openings,
        "outcomes": req.outcomes,
        "job": req.job,
        "top_k": 3
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = server::create_router(test_engine());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_match_endpoint_returns_ranking() {
    let (status, body) = post_match(request_json()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ranking"]["rows"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["report"]["rows"].as_array().map(Vec::len), Some(3));
    assert!(body["stats"]["total_time_ms"].is_u64());
}

#[tokio::test]
async fn test_match_endpoint_rejects_bad_weights() {
    let mut req = request_json();
    req["weights"] = json!({
        "area": 0.5, "profile": 0.5, "role_level": 0.5,
        "education": 0.0, "age": 0.0, "regime": 0.0
    });
    let (status, body) = post_match(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "config_error");
}

#[tokio::test]
async fn test_match_endpoint_reports_missing_fields() {
    let mut req = request_json();
    for row in req["candidates"]["rows"].as_array_mut().unwrap() {
        row.as_object_mut().unwrap().remove("area_code");
    }
    let (status, body) = post_match(req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "schema_error");
    assert_eq!(body["missing_fields"], json!(["area_code"]));
}

#[tokio::test]
async fn test_match_endpoint_accepts_float_codes() {
    let mut req = request_json();
    req["job"]["area_code"] = json!(26.0);
    req["job"]["role_level_code"] = json!(3);
    let (status, body) = post_match(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ranking"]["rows"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_match_endpoint_rejects_fractional_codes() {
    let mut req = request_json();
    req["job"]["area_code"] = json!(26.5);
    let (status, body) = post_match(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "config_error");
}
