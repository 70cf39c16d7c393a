//! Core type definitions for candidate/opening matching

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// One raw record as delivered by the loading layer (column name -> cell)
pub type RawRecord = Map<String, Value>;

/// A raw table of flat records. `columns` lists the header when the source
/// has one; otherwise the header is the union of keys seen in the rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    #[serde(default)]
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    pub fn from_rows(rows: Vec<RawRecord>) -> Self {
        Self { columns: vec![], rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        if !self.columns.is_empty() {
            return self.columns.iter().any(|c| c == name);
        }
        self.rows.iter().any(|row| row.contains_key(name))
    }
}

/// Column names of the input tables
pub mod columns {
    pub const CANDIDATE_ID: &str = "id";
    pub const OPENING_ID: &str = "opening_id";
    pub const OUTCOME_CANDIDATE_ID: &str = "candidate_id";
    pub const OUTCOME_OPENING_ID: &str = "opening_id";
    pub const LABEL: &str = "match";
    pub const NAME: &str = "name";
    pub const AREA_LABEL: &str = "area";
    pub const ROLE_LABEL: &str = "role";
    pub const EDUCATION_LABEL: &str = "education";
}

/// The nine numeric attributes shared by candidates, openings and job specs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeField {
    AgeBracket,
    EducationLevel,
    RoleLevel,
    Area,
    Regime,
    Authority,
    Prestige,
    Security,
    Formality,
}

impl AttributeField {
    pub const ALL: [AttributeField; 9] = [
        AttributeField::AgeBracket,
        AttributeField::EducationLevel,
        AttributeField::RoleLevel,
        AttributeField::Area,
        AttributeField::Regime,
        AttributeField::Authority,
        AttributeField::Prestige,
        AttributeField::Security,
        AttributeField::Formality,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            AttributeField::AgeBracket => "age_bracket_code",
            AttributeField::EducationLevel => "education_level_code",
            AttributeField::RoleLevel => "role_level_code",
            AttributeField::Area => "area_code",
            AttributeField::Regime => "regime_code",
            AttributeField::Authority => "authority",
            AttributeField::Prestige => "prestige",
            AttributeField::Security => "security",
            AttributeField::Formality => "formality",
        }
    }

    /// Behavioral scalars are imputed with the neutral midpoint, codes with the column mode
    pub fn is_behavioral(&self) -> bool {
        matches!(
            self,
            AttributeField::Authority
                | AttributeField::Prestige
                | AttributeField::Security
                | AttributeField::Formality
        )
    }

    /// Value used when a column has nothing to impute from
    pub fn fallback(&self) -> f64 {
        match self {
            AttributeField::AgeBracket => 2.0,
            AttributeField::EducationLevel => 4.0,
            AttributeField::RoleLevel => 3.0,
            AttributeField::Area => 1.0,
            AttributeField::Regime => 0.0,
            _ => NEUTRAL_BEHAVIORAL,
        }
    }
}

/// Neutral midpoint of a four-way behavioral split
pub const NEUTRAL_BEHAVIORAL: f64 = 25.0;

/// Numeric attribute block after cleaning
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Attributes {
    pub age_bracket: f64,
    pub education_level: f64,
    pub role_level: f64,
    pub area: f64,
    pub regime: f64,
    pub authority: f64,
    pub prestige: f64,
    pub security: f64,
    pub formality: f64,
}

impl Attributes {
    pub fn get(&self, field: AttributeField) -> f64 {
        match field {
            AttributeField::AgeBracket => self.age_bracket,
            AttributeField::EducationLevel => self.education_level,
            AttributeField::RoleLevel => self.role_level,
            AttributeField::Area => self.area,
            AttributeField::Regime => self.regime,
            AttributeField::Authority => self.authority,
            AttributeField::Prestige => self.prestige,
            AttributeField::Security => self.security,
            AttributeField::Formality => self.formality,
        }
    }

    pub fn set(&mut self, field: AttributeField, value: f64) {
        let slot = match field {
            AttributeField::AgeBracket => &mut self.age_bracket,
            AttributeField::EducationLevel => &mut self.education_level,
            AttributeField::RoleLevel => &mut self.role_level,
            AttributeField::Area => &mut self.area,
            AttributeField::Regime => &mut self.regime,
            AttributeField::Authority => &mut self.authority,
            AttributeField::Prestige => &mut self.prestige,
            AttributeField::Security => &mut self.security,
            AttributeField::Formality => &mut self.formality,
        };
        *slot = value;
    }
}

/// A live or historical candidate after imputation
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub id: String,
    pub name: Option<String>,
    pub attributes: Attributes,
    /// Textual fields passed through for presentation
    pub display: BTreeMap<String, String>,
}

/// A historical opening after imputation
#[derive(Debug, Clone, Serialize)]
pub struct Opening {
    pub id: String,
    pub attributes: Attributes,
}

/// Historical match outcome (label 1 = good match)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub opening_id: String,
    pub candidate_id: String,
    pub label: u8,
}

/// The opening to match against. Supplied by the caller, never imputed.
/// Codes arrive as JSON numbers and must hold whole values (`26` or `26.0`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub age_bracket_code: f64,
    pub education_level_code: f64,
    pub role_level_code: f64,
    pub area_code: f64,
    pub regime_code: f64,
    pub authority: f64,
    pub prestige: f64,
    pub security: f64,
    pub formality: f64,
}

impl JobSpec {
    /// Allowed deviation of the behavioral profile from 100
    pub const PROFILE_TOLERANCE: f64 = 1.0;

    pub fn attributes(&self) -> Attributes {
        Attributes {
            age_bracket: self.age_bracket_code,
            education_level: self.education_level_code,
            role_level: self.role_level_code,
            area: self.area_code,
            regime: self.regime_code,
            authority: self.authority,
            prestige: self.prestige,
            security: self.security,
            formality: self.formality,
        }
    }

    pub fn profile_sum(&self) -> f64 {
        self.authority + self.prestige + self.security + self.formality
    }

    /// Boundary check; the core assumes a validated spec
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("age_bracket_code", self.age_bracket_code),
            ("education_level_code", self.education_level_code),
            ("role_level_code", self.role_level_code),
            ("area_code", self.area_code),
            ("regime_code", self.regime_code),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteField { field: field.to_string() });
            }
            if value.fract() != 0.0 {
                return Err(ConfigError::NonIntegralCode { field: field.to_string(), value });
            }
        }
        for (field, value) in [
            ("authority", self.authority),
            ("prestige", self.prestige),
            ("security", self.security),
            ("formality", self.formality),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteField { field: field.to_string() });
            }
        }
        let sum = self.profile_sum();
        if (sum - 100.0).abs() > Self::PROFILE_TOLERANCE {
            return Err(ConfigError::ProfileSum { sum });
        }
        Ok(())
    }
}

/// Scoring dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    Area,
    Profile,
    RoleLevel,
    Education,
    Age,
    Regime,
}

impl Aspect {
    pub const ALL: [Aspect; 6] = [
        Aspect::Area,
        Aspect::Profile,
        Aspect::RoleLevel,
        Aspect::Education,
        Aspect::Age,
        Aspect::Regime,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Aspect::Area => "area",
            Aspect::Profile => "profile",
            Aspect::RoleLevel => "role_level",
            Aspect::Education => "education",
            Aspect::Age => "age",
            Aspect::Regime => "regime",
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-aspect weights of the composite score (fractions summing to 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub area: f64,
    pub profile: f64,
    pub role_level: f64,
    pub education: f64,
    pub age: f64,
    pub regime: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            area: 0.35,
            profile: 0.30,
            role_level: 0.20,
            education: 0.10,
            age: 0.03,
            regime: 0.02,
        }
    }
}

impl Weights {
    pub const FRACTION_TOLERANCE: f64 = 0.01;
    pub const PERCENT_TOLERANCE: f64 = 1.0;

    pub fn get(&self, aspect: Aspect) -> f64 {
        match aspect {
            Aspect::Area => self.area,
            Aspect::Profile => self.profile,
            Aspect::RoleLevel => self.role_level,
            Aspect::Education => self.education,
            Aspect::Age => self.age,
            Aspect::Regime => self.regime,
        }
    }

    pub fn sum(&self) -> f64 {
        Aspect::ALL.iter().map(|a| self.get(*a)).sum()
    }

    /// Validate weights given as fractions
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_entries()?;
        let sum = self.sum();
        if (sum - 1.0).abs() > Self::FRACTION_TOLERANCE {
            return Err(ConfigError::WeightsSum { sum, expected: 1.0 });
        }
        Ok(())
    }

    /// Validate weights given as percentages and convert them to fractions
    pub fn from_percentages(percent: Weights) -> Result<Self, ConfigError> {
        percent.check_entries()?;
        let sum = percent.sum();
        if (sum - 100.0).abs() > Self::PERCENT_TOLERANCE {
            return Err(ConfigError::WeightsSum { sum, expected: 100.0 });
        }
        Ok(Self {
            area: percent.area / 100.0,
            profile: percent.profile / 100.0,
            role_level: percent.role_level / 100.0,
            education: percent.education / 100.0,
            age: percent.age / 100.0,
            regime: percent.regime / 100.0,
        })
    }

    fn check_entries(&self) -> Result<(), ConfigError> {
        for aspect in Aspect::ALL {
            let value = self.get(aspect);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { aspect: aspect.to_string(), value });
            }
        }
        Ok(())
    }
}

/// Per-aspect multipliers controlling how fast a difference saturates a score to 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyFactors {
    pub area: f64,
    pub profile: f64,
    pub role_level: f64,
    pub education: f64,
    pub age: f64,
    pub regime: f64,
}

impl Default for PenaltyFactors {
    fn default() -> Self {
        Self {
            area: 10.0,
            profile: 1.5,
            role_level: 12.5,
            education: 7.0,
            age: 10.0,
            regime: 25.0,
        }
    }
}

impl PenaltyFactors {
    pub fn get(&self, aspect: Aspect) -> f64 {
        match aspect {
            Aspect::Area => self.area,
            Aspect::Profile => self.profile,
            Aspect::RoleLevel => self.role_level,
            Aspect::Education => self.education,
            Aspect::Age => self.age,
            Aspect::Regime => self.regime,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for aspect in Aspect::ALL {
            let value = self.get(aspect);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidPenalty { aspect: aspect.to_string(), value });
            }
        }
        Ok(())
    }
}

pub const FEATURE_COUNT: usize = 10;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "diff_age",
    "diff_education",
    "diff_area",
    "diff_role_level",
    "diff_regime",
    "diff_authority",
    "diff_prestige",
    "diff_security",
    "diff_formality",
    "profile_distance",
];

/// Model input row, in `FEATURE_NAMES` order
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Absolute attribute differences plus the behavioral profile distance
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FeatureVector {
    pub diff_age: f64,
    pub diff_education: f64,
    pub diff_area: f64,
    pub diff_role_level: f64,
    pub diff_regime: f64,
    pub diff_authority: f64,
    pub diff_prestige: f64,
    pub diff_security: f64,
    pub diff_formality: f64,
    pub profile_distance: f64,
}

impl FeatureVector {
    pub fn to_row(&self) -> FeatureRow {
        [
            self.diff_age,
            self.diff_education,
            self.diff_area,
            self.diff_role_level,
            self.diff_regime,
            self.diff_authority,
            self.diff_prestige,
            self.diff_security,
            self.diff_formality,
            self.profile_distance,
        ]
    }

    pub fn from_row(row: &FeatureRow) -> Self {
        Self {
            diff_age: row[0],
            diff_education: row[1],
            diff_area: row[2],
            diff_role_level: row[3],
            diff_regime: row[4],
            diff_authority: row[5],
            diff_prestige: row[6],
            diff_security: row[7],
            diff_formality: row[8],
            profile_distance: row[9],
        }
    }

    /// The difference an aspect score is computed from
    pub fn aspect_difference(&self, aspect: Aspect) -> f64 {
        match aspect {
            Aspect::Area => self.diff_area,
            Aspect::Profile => self.profile_distance,
            Aspect::RoleLevel => self.diff_role_level,
            Aspect::Education => self.diff_education,
            Aspect::Age => self.diff_age,
            Aspect::Regime => self.diff_regime,
        }
    }
}

/// The three trained classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
    RandomForest,
    GradientBoosting,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::LogisticRegression,
        ModelKind::RandomForest,
        ModelKind::GradientBoosting,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::RandomForest => "Random Forest",
            ModelKind::GradientBoosting => "Gradient Boosting",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Positive-class probability from each model
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ModelProbabilities {
    pub logistic_regression: f64,
    pub random_forest: f64,
    pub gradient_boosting: f64,
}

impl ModelProbabilities {
    pub fn get(&self, kind: ModelKind) -> f64 {
        match kind {
            ModelKind::LogisticRegression => self.logistic_regression,
            ModelKind::RandomForest => self.random_forest,
            ModelKind::GradientBoosting => self.gradient_boosting,
        }
    }

    pub fn set(&mut self, kind: ModelKind, value: f64) {
        match kind {
            ModelKind::LogisticRegression => self.logistic_regression = value,
            ModelKind::RandomForest => self.random_forest = value,
            ModelKind::GradientBoosting => self.gradient_boosting = value,
        }
    }
}

/// Heuristic score per aspect, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AspectScores {
    pub area: f64,
    pub profile: f64,
    pub role_level: f64,
    pub education: f64,
    pub age: f64,
    pub regime: f64,
}

impl AspectScores {
    pub fn get(&self, aspect: Aspect) -> f64 {
        match aspect {
            Aspect::Area => self.area,
            Aspect::Profile => self.profile,
            Aspect::RoleLevel => self.role_level,
            Aspect::Education => self.education,
            Aspect::Age => self.age,
            Aspect::Regime => self.regime,
        }
    }

    pub fn set(&mut self, aspect: Aspect, value: f64) {
        match aspect {
            Aspect::Area => self.area = value,
            Aspect::Profile => self.profile = value,
            Aspect::RoleLevel => self.role_level = value,
            Aspect::Education => self.education = value,
            Aspect::Age => self.age = value,
            Aspect::Regime => self.regime = value,
        }
    }
}

/// Presentation labels for a ranked row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayLabels {
    pub area: Option<String>,
    pub area_cluster: Option<String>,
    pub role: Option<String>,
    pub education: Option<String>,
    pub age_bracket: Option<String>,
    pub regime: Option<String>,
}

/// One row of the ranked output
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub id: String,
    pub name: Option<String>,
    pub labels: DisplayLabels,
    pub scores: AspectScores,
    pub composite: f64,
    pub probabilities: ModelProbabilities,
}

/// Candidate listed by a single model's probability
#[derive(Debug, Clone, Serialize)]
pub struct ProbabilityEntry {
    pub id: String,
    pub name: Option<String>,
    pub probability: f64,
}

/// Held-out quality of one trained model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityReportRow {
    pub model: ModelKind,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
    pub score_total: f64,
}
