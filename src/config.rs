//! Engine configuration: reference defaults, env overrides, validation

use crate::error::ConfigError;
use crate::models::{BoostingParams, ForestParams, LogisticParams};
use serde::Deserialize;
use std::str::FromStr;

pub const ENV_TOP_K: &str = "MATCHRANK_TOP_K";
pub const ENV_SEED: &str = "MATCHRANK_SEED";
pub const ENV_TEST_FRACTION: &str = "MATCHRANK_TEST_FRACTION";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ranked rows returned per request
    pub top_k: usize,
    /// Share of labeled rows held out for evaluation
    pub test_fraction: f64,
    /// Seed for the train/test split
    pub seed: u64,
    pub logistic: LogisticParams,
    pub forest: ForestParams,
    pub boosting: BoostingParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            test_fraction: 0.2,
            seed: 42,
            logistic: LogisticParams::default(),
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `MATCHRANK_*` environment variables.
    /// `MATCHRANK_SEED` seeds the split and both tree models.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env` over an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(top_k) = parse_var(&lookup, ENV_TOP_K)? {
            config.top_k = top_k;
        }
        if let Some(fraction) = parse_var(&lookup, ENV_TEST_FRACTION)? {
            config.test_fraction = fraction;
        }
        if let Some(seed) = parse_var(&lookup, ENV_SEED)? {
            config.seed = seed;
            config.forest.seed = seed;
            config.boosting.seed = seed;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::TestFraction(self.test_fraction));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVar {
                name: name.to_string(),
                value: raw,
            }),
    }
}
