//! Heuristic per-aspect scores and the weighted composite

use crate::types::*;

/// Upper bound of every aspect score
pub const MAX_SCORE: f64 = 100.0;

/// `100 - min(diff * penalty, 100)`; a zero difference is a perfect 100
pub fn aspect_score(difference: f64, penalty: f64) -> f64 {
    MAX_SCORE - (difference * penalty).min(MAX_SCORE)
}

/// Score every aspect of one candidate/job comparison
pub fn aspect_scores(features: &FeatureVector, penalties: &PenaltyFactors) -> AspectScores {
    let mut scores = AspectScores::default();
    for aspect in Aspect::ALL {
        scores.set(
            aspect,
            aspect_score(features.aspect_difference(aspect), penalties.get(aspect)),
        );
    }
    scores
}

/// Weighted sum of the aspect scores; the ranking key
pub fn composite_score(scores: &AspectScores, weights: &Weights) -> f64 {
    Aspect::ALL
        .iter()
        .map(|&aspect| weights.get(aspect) * scores.get(aspect))
        .sum()
}
