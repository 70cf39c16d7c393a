//! Error types for the matching pipeline

use serde::Serialize;
use std::fmt;

/// Which input table a structural error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Candidates,
    Openings,
    Outcomes,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Candidates => "candidates",
            EntityKind::Openings => "openings",
            EntityKind::Outcomes => "outcomes",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the core pipeline. All of them are recoverable at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("{entity} table is missing required fields: {}", missing.join(", "))]
    Schema {
        entity: EntityKind,
        missing: Vec<String>,
    },

    #[error(
        "no overlapping records after join ({outcomes} outcomes, {candidates} candidates, {openings} openings)"
    )]
    EmptyJoin {
        outcomes: usize,
        candidates: usize,
        openings: usize,
    },

    #[error("insufficient data to train: {rows} labeled rows")]
    InsufficientData { rows: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MatchError {
    /// Stable machine-readable kind, used by the HTTP layer
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::Schema { .. } => "schema_error",
            MatchError::EmptyJoin { .. } => "empty_join_result",
            MatchError::InsufficientData { .. } => "insufficient_data",
            MatchError::Config(_) => "config_error",
        }
    }
}

/// Boundary validation failures for caller-supplied configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("weights must sum to {expected} (got {sum:.4})")]
    WeightsSum { sum: f64, expected: f64 },

    #[error("weight for {aspect} must be a non-negative number (got {value})")]
    InvalidWeight { aspect: String, value: f64 },

    #[error("penalty factor for {aspect} must be a non-negative number (got {value})")]
    InvalidPenalty { aspect: String, value: f64 },

    #[error("behavioral profile must sum to 100 (got {sum:.2})")]
    ProfileSum { sum: f64 },

    #[error("job specification field {field} is not a finite number")]
    NonFiniteField { field: String },

    #[error("job specification code {field} must be a whole number (got {value})")]
    NonIntegralCode { field: String, value: f64 },

    #[error("top_k must be at least 1")]
    ZeroTopK,

    #[error("test fraction must lie strictly between 0 and 1 (got {0})")]
    TestFraction(f64),

    #[error("environment variable {name} has an invalid value: {value:?}")]
    EnvVar { name: String, value: String },
}

pub type Result<T> = std::result::Result<T, MatchError>;
