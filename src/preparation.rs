//! Validation, cleaning and joining of the raw input tables

use crate::error::{EntityKind, MatchError, Result};
use crate::features::derive_features;
use crate::types::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Required fields per entity kind
pub fn required_fields(entity: EntityKind) -> Vec<&'static str> {
    let attributes = AttributeField::ALL.iter().map(|f| f.column());
    match entity {
        EntityKind::Candidates => std::iter::once(columns::CANDIDATE_ID).chain(attributes).collect(),
        EntityKind::Openings => std::iter::once(columns::OPENING_ID).chain(attributes).collect(),
        EntityKind::Outcomes => vec![
            columns::OUTCOME_OPENING_ID,
            columns::OUTCOME_CANDIDATE_ID,
            columns::LABEL,
        ],
    }
}

/// Fail with a schema error naming every missing field
pub fn validate_fields(table: &RawTable, entity: EntityKind) -> Result<()> {
    let missing: Vec<String> = required_fields(entity)
        .into_iter()
        .filter(|field| !table.has_column(field))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MatchError::Schema { entity, missing })
    }
}

/// Lenient numeric coercion; anything unparsable is treated as missing
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Canonical join key: integral numbers (and numeric strings) print without a fraction
pub fn canonical_id(value: &Value) -> Option<String> {
    let text = match value {
        Value::Number(_) => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(trimmed.to_string())
        }
        _ => return None,
    };

    match coerce_number(value) {
        Some(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Some(format!("{}", n as i64)),
        Some(n) => Some(format!("{n}")),
        None => text,
    }
}

/// Imputations applied while cleaning one table, per column
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImputationReport {
    pub counts: BTreeMap<String, usize>,
}

impl ImputationReport {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    fn record(&mut self, column: &str, count: usize) {
        if count > 0 {
            *self.counts.entry(column.to_string()).or_insert(0) += count;
        }
    }
}

/// Most frequent value; ties resolve to the smallest value
pub fn column_mode(values: &[Option<f64>]) -> Option<f64> {
    let mut counts: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
    for v in values.iter().flatten() {
        // normalize -0.0 so it counts with 0.0
        let v = if *v == 0.0 { 0.0 } else { *v };
        counts.entry(v.to_bits()).or_insert((v, 0)).1 += 1;
    }
    counts
        .into_values()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.total_cmp(va)))
        .map(|(v, _)| v)
}

/// Fill missing cells of one attribute column per the imputation policy
fn impute_column(values: Vec<Option<f64>>, field: AttributeField) -> (Vec<f64>, usize) {
    let fill = if field.is_behavioral() {
        NEUTRAL_BEHAVIORAL
    } else {
        column_mode(&values).unwrap_or_else(|| field.fallback())
    };
    let missing = values.iter().filter(|v| v.is_none()).count();
    (values.into_iter().map(|v| v.unwrap_or(fill)).collect(), missing)
}

/// Extract and impute the nine attribute columns of a table
fn clean_attributes(table: &RawTable, report: &mut ImputationReport) -> Vec<Attributes> {
    let mut rows = vec![Attributes::default(); table.len()];
    for field in AttributeField::ALL {
        let raw: Vec<Option<f64>> = table
            .rows
            .iter()
            .map(|row| row.get(field.column()).and_then(coerce_number))
            .collect();
        let (values, missing) = impute_column(raw, field);
        report.record(field.column(), missing);
        for (attrs, value) in rows.iter_mut().zip(values) {
            attrs.set(field, value);
        }
    }
    rows
}

fn text_field(row: &RawRecord, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A cleaned table plus the imputations applied to it
#[derive(Debug, Clone)]
pub struct Cleaned<T> {
    pub records: Vec<T>,
    pub imputation: ImputationReport,
}

/// Validate and clean a candidate table
pub fn clean_candidates(table: &RawTable) -> Result<Cleaned<Candidate>> {
    validate_fields(table, EntityKind::Candidates)?;
    let mut imputation = ImputationReport::default();
    let attributes = clean_attributes(table, &mut imputation);

    let attribute_columns: Vec<&str> = AttributeField::ALL.iter().map(|f| f.column()).collect();
    let records = table
        .rows
        .iter()
        .zip(attributes)
        .map(|(row, attributes)| {
            let display = row
                .iter()
                .filter(|(key, _)| {
                    key.as_str() != columns::CANDIDATE_ID
                        && key.as_str() != columns::NAME
                        && !attribute_columns.contains(&key.as_str())
                })
                .filter_map(|(key, _)| text_field(row, key).map(|text| (key.clone(), text)))
                .collect();
            Candidate {
                id: row.get(columns::CANDIDATE_ID).and_then(canonical_id).unwrap_or_default(),
                name: text_field(row, columns::NAME),
                attributes,
                display,
            }
        })
        .collect();

    log_imputation(EntityKind::Candidates, &imputation);
    Ok(Cleaned { records, imputation })
}

/// Validate and clean a historical opening table
pub fn clean_openings(table: &RawTable) -> Result<Cleaned<Opening>> {
    validate_fields(table, EntityKind::Openings)?;
    let mut imputation = ImputationReport::default();
    let attributes = clean_attributes(table, &mut imputation);

    let records = table
        .rows
        .iter()
        .zip(attributes)
        .map(|(row, attributes)| Opening {
            id: row.get(columns::OPENING_ID).and_then(canonical_id).unwrap_or_default(),
            attributes,
        })
        .collect();

    log_imputation(EntityKind::Openings, &imputation);
    Ok(Cleaned { records, imputation })
}

/// Validate and clean an outcome table. Labels truncate to integers; 1 or more
/// means a good match, anything lower (including negatives) means 0.
pub fn clean_outcomes(table: &RawTable) -> Result<Cleaned<Outcome>> {
    validate_fields(table, EntityKind::Outcomes)?;
    let mut imputation = ImputationReport::default();
    let mut missing_labels = 0;

    let records = table
        .rows
        .iter()
        .map(|row| {
            let label = match row.get(columns::LABEL).and_then(coerce_number) {
                Some(v) => u8::from(v.trunc() >= 1.0),
                None => {
                    missing_labels += 1;
                    0
                }
            };
            Outcome {
                opening_id: row
                    .get(columns::OUTCOME_OPENING_ID)
                    .and_then(canonical_id)
                    .unwrap_or_default(),
                candidate_id: row
                    .get(columns::OUTCOME_CANDIDATE_ID)
                    .and_then(canonical_id)
                    .unwrap_or_default(),
                label,
            }
        })
        .collect();

    imputation.record(columns::LABEL, missing_labels);
    log_imputation(EntityKind::Outcomes, &imputation);
    Ok(Cleaned { records, imputation })
}

fn log_imputation(entity: EntityKind, report: &ImputationReport) {
    if report.total() == 0 {
        return;
    }
    for (column, count) in &report.counts {
        debug!(%entity, column = %column, count, "imputed missing values");
    }
    info!(%entity, total = report.total(), "imputation fallback applied");
}

/// One joined (candidate, opening) pair with its label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledRow {
    pub candidate_id: String,
    pub opening_id: String,
    pub features: FeatureVector,
    pub label: u8,
}

/// Label balance of a labeled table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DatasetStats {
    pub total: usize,
    pub positives: usize,
    pub negatives: usize,
}

impl DatasetStats {
    pub fn from_labels<'a, I: IntoIterator<Item = &'a u8>>(labels: I) -> Self {
        let mut stats = Self::default();
        for label in labels {
            stats.total += 1;
            if *label == 1 {
                stats.positives += 1;
            } else {
                stats.negatives += 1;
            }
        }
        stats
    }

    pub fn positive_share(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.positives as f64 / self.total as f64
        }
    }
}

/// The labeled training table
#[derive(Debug, Clone, Serialize)]
pub struct PreparedTable {
    pub rows: Vec<LabeledRow>,
    pub stats: DatasetStats,
    pub imputation: BTreeMap<EntityKind, ImputationReport>,
}

impl PreparedTable {
    pub fn feature_rows(&self) -> Vec<FeatureRow> {
        self.rows.iter().map(|r| r.features.to_row()).collect()
    }

    pub fn labels(&self) -> Vec<u8> {
        self.rows.iter().map(|r| r.label).collect()
    }
}

fn index_by_id<'a, T>(records: &'a [T], id: impl Fn(&T) -> &str) -> HashMap<&'a str, Vec<usize>> {
    let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        let key = id(record);
        if !key.is_empty() {
            index.entry(key).or_default().push(i);
        }
    }
    index
}

/// Build the labeled feature table from the three historical tables.
///
/// Outcomes are inner-joined to candidates, then to openings; rows whose keys
/// do not resolve are dropped. An empty join is reported as `EmptyJoin`.
pub fn prepare_training_table(
    candidates: &RawTable,
    openings: &RawTable,
    outcomes: &RawTable,
) -> Result<PreparedTable> {
    let candidates = clean_candidates(candidates)?;
    let openings = clean_openings(openings)?;
    let outcomes = clean_outcomes(outcomes)?;

    let by_candidate = index_by_id(&candidates.records, |c| c.id.as_str());
    let by_opening = index_by_id(&openings.records, |o| o.id.as_str());

    let mut rows = Vec::new();
    for outcome in &outcomes.records {
        let (Some(cand_idx), Some(open_idx)) = (
            by_candidate.get(outcome.candidate_id.as_str()),
            by_opening.get(outcome.opening_id.as_str()),
        ) else {
            continue;
        };
        for &ci in cand_idx {
            for &oi in open_idx {
                let candidate = &candidates.records[ci];
                let opening = &openings.records[oi];
                rows.push(LabeledRow {
                    candidate_id: candidate.id.clone(),
                    opening_id: opening.id.clone(),
                    features: derive_features(&candidate.attributes, &opening.attributes),
                    label: outcome.label,
                });
            }
        }
    }

    if rows.is_empty() {
        return Err(MatchError::EmptyJoin {
            outcomes: outcomes.records.len(),
            candidates: candidates.records.len(),
            openings: openings.records.len(),
        });
    }

    let swept = sweep_residual_missing(&mut rows);
    if swept > 0 {
        debug!(cells = swept, "residual missing feature cells set to 0");
    }

    let stats = DatasetStats::from_labels(rows.iter().map(|r| &r.label));
    info!(
        "Training table: {} rows, {} good matches ({:.1}%), {} poor matches",
        stats.total,
        stats.positives,
        stats.positive_share() * 100.0,
        stats.negatives
    );

    let imputation = BTreeMap::from([
        (EntityKind::Candidates, candidates.imputation),
        (EntityKind::Openings, openings.imputation),
        (EntityKind::Outcomes, outcomes.imputation),
    ]);

    Ok(PreparedTable { rows, stats, imputation })
}

/// Last-resort table-level fill: any non-finite feature cell becomes 0
fn sweep_residual_missing(rows: &mut [LabeledRow]) -> usize {
    let mut swept = 0;
    for row in rows.iter_mut() {
        let mut cells = row.features.to_row();
        for cell in cells.iter_mut() {
            if !cell.is_finite() {
                *cell = 0.0;
                swept += 1;
            }
        }
        row.features = FeatureVector::from_row(&cells);
    }
    swept
}
