//! HTTP server for candidate matching

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::engine::{MatchRequest, MatchResponse, SharedMatchEngine};
use crate::error::MatchError;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Failures of the match endpoint
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("matching task failed: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Match(MatchError::Config(_)) => StatusCode::BAD_REQUEST,
            ApiError::Match(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::Match(err) => ErrorResponse {
                error: "Matching failed".to_string(),
                kind: err.kind(),
                details: Some(err.to_string()),
                missing_fields: match err {
                    MatchError::Schema { missing, .. } => Some(missing.clone()),
                    _ => None,
                },
            },
            ApiError::Internal(details) => ErrorResponse {
                error: "Internal error".to_string(),
                kind: "internal_error",
                details: Some(details.clone()),
                missing_fields: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = %status, error = %self, "match request failed");
        } else {
            warn!(status = %status, error = %self, "match request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

/// Match handler. The pipeline is CPU-bound, so it runs off the async workers.
async fn match_handler(
    State(engine): State<SharedMatchEngine>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    info!(
        "Received match request: {} candidates, {} openings, {} outcomes",
        req.candidates.len(),
        req.openings.len(),
        req.outcomes.len()
    );

    let response = tokio::task::spawn_blocking(move || engine.run(req))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    info!(
        "Match successful: {} ranked rows in {} ms",
        response.ranking.rows.len(),
        response.stats.total_time_ms
    );
    Ok(Json(response))
}

/// Health check handler
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "matchrank".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create and configure the HTTP server
pub fn create_router(engine: SharedMatchEngine) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/match", post(match_handler))
        .with_state(engine)
}

/// Run the HTTP server
pub async fn run_server(engine: SharedMatchEngine, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!("Starting matchrank server on {}", addr);

    let app = create_router(engine);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, EntityKind};

    #[test]
    fn status_codes_follow_error_kind() {
        let config: ApiError = MatchError::from(ConfigError::ZeroTopK).into();
        assert_eq!(config.status_code(), StatusCode::BAD_REQUEST);

        let empty: ApiError = MatchError::EmptyJoin { outcomes: 1, candidates: 1, openings: 1 }.into();
        assert_eq!(empty.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let internal = ApiError::Internal("boom".into());
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn schema_errors_list_missing_fields() {
        let err: ApiError = MatchError::Schema {
            entity: EntityKind::Candidates,
            missing: vec!["area_code".into()],
        }
        .into();
        let body = err.body();
        assert_eq!(body.kind, "schema_error");
        assert_eq!(body.missing_fields, Some(vec!["area_code".to_string()]));
    }
}
