//! Feature derivation shared by training-table construction and live scoring

use crate::types::{Attributes, FeatureRow, FeatureVector, FEATURE_COUNT};

/// Fill used for a missing column whose observed maximum is undefined or zero
pub const MISSING_COLUMN_FILL: f64 = 10.0;

/// Absolute attribute differences between a candidate and an opening/job spec,
/// plus the Euclidean distance over the four behavioral differences.
pub fn derive_features(candidate: &Attributes, target: &Attributes) -> FeatureVector {
    let diff_authority = (candidate.authority - target.authority).abs();
    let diff_prestige = (candidate.prestige - target.prestige).abs();
    let diff_security = (candidate.security - target.security).abs();
    let diff_formality = (candidate.formality - target.formality).abs();

    FeatureVector {
        diff_age: (candidate.age_bracket - target.age_bracket).abs(),
        diff_education: (candidate.education_level - target.education_level).abs(),
        diff_area: (candidate.area - target.area).abs(),
        diff_role_level: (candidate.role_level - target.role_level).abs(),
        diff_regime: (candidate.regime - target.regime).abs(),
        diff_authority,
        diff_prestige,
        diff_security,
        diff_formality,
        profile_distance: (diff_authority.powi(2)
            + diff_prestige.powi(2)
            + diff_security.powi(2)
            + diff_formality.powi(2))
        .sqrt(),
    }
}

/// Derive features for every candidate against one target in a single pass.
///
/// Non-finite cells are replaced by the column's observed maximum (or
/// `MISSING_COLUMN_FILL` when that maximum is undefined or zero), so a missing
/// value scores as maximally dissimilar rather than as a perfect match.
pub fn derive_feature_table<'a, I>(candidates: I, target: &Attributes) -> Vec<FeatureVector>
where
    I: IntoIterator<Item = &'a Attributes>,
{
    let mut rows: Vec<FeatureRow> = candidates
        .into_iter()
        .map(|c| derive_features(c, target).to_row())
        .collect();
    fill_missing_with_column_max(&mut rows);
    rows.iter().map(FeatureVector::from_row).collect()
}

/// Per-column max-fill for non-finite cells
pub fn fill_missing_with_column_max(rows: &mut [FeatureRow]) -> usize {
    let mut filled = 0;
    for col in 0..FEATURE_COUNT {
        if rows.iter().all(|row| row[col].is_finite()) {
            continue;
        }
        let max = rows
            .iter()
            .map(|row| row[col])
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));
        let fill = match max {
            Some(m) if m != 0.0 => m,
            _ => MISSING_COLUMN_FILL,
        };
        for row in rows.iter_mut() {
            if !row[col].is_finite() {
                row[col] = fill;
                filled += 1;
            }
        }
    }
    if filled > 0 {
        tracing::debug!(cells = filled, "filled missing feature cells with column maxima");
    }
    filled
}
