//! Matchrank - candidate/job matching engine
//!
//! Ranks candidates against a job opening with:
//! - Absolute attribute differences and a behavioral profile distance
//! - A weighted, penalty-saturated heuristic composite score (the ranking key)
//! - Three classifiers trained on historical outcomes, reported side by side
//! - Stable top-K selection

pub mod codes;
pub mod config;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod preparation;
pub mod report;
pub mod rng;
pub mod scoring;
pub mod selection;
pub mod server;
pub mod split;
pub mod types;

pub use config::EngineConfig;
pub use engine::{MatchEngine, MatchRequest, MatchResponse, Ranking, SharedMatchEngine, WeightsUnit};
pub use ensemble::{train_models, SharedEnsemble, TrainedEnsemble, TrainingOutcome};
pub use error::{ConfigError, EntityKind, MatchError, Result};
pub use features::{derive_feature_table, derive_features};
pub use preparation::{prepare_training_table, PreparedTable};
pub use report::ModelComparison;
pub use types::*;

#[cfg(test)]
mod tests;
