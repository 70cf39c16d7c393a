use matchrank::scoring::{aspect_score, aspect_scores, composite_score};
use matchrank::selection::top_k_indices;
use matchrank::{derive_features, Attributes, FeatureVector, PenaltyFactors, Weights};
use proptest::prelude::*;

fn attributes() -> impl Strategy<Value = Attributes> {
    (
        (0.0..10.0f64, 0.0..14.0f64, 0.0..8.0f64, 1.0..70.0f64, 0.0..3.0f64),
        (0.0..100.0f64, 0.0..100.0f64, 0.0..100.0f64, 0.0..100.0f64),
    )
        .prop_map(|((age, edu, role, area, regime), (a, p, s, f))| Attributes {
            age_bracket: age.round(),
            education_level: edu.round(),
            role_level: role.round(),
            area: area.round(),
            regime: regime.round(),
            authority: a,
            prestige: p,
            security: s,
            formality: f,
        })
}

/// Six non-negative weights normalized to sum to 1
fn weights() -> impl Strategy<Value = Weights> {
    prop::array::uniform6(0.01..1.0f64).prop_map(|w| {
        let total: f64 = w.iter().sum();
        Weights {
            area: w[0] / total,
            profile: w[1] / total,
            role_level: w[2] / total,
            education: w[3] / total,
            age: w[4] / total,
            regime: w[5] / total,
        }
    })
}

fn penalties() -> impl Strategy<Value = PenaltyFactors> {
    prop::array::uniform6(0.0..50.0f64).prop_map(|p| PenaltyFactors {
        area: p[0],
        profile: p[1],
        role_level: p[2],
        education: p[3],
        age: p[4],
        regime: p[5],
    })
}

proptest! {
    #[test]
    fn features_are_non_negative(c in attributes(), j in attributes()) {
        let row = derive_features(&c, &j).to_row();
        prop_assert!(row.iter().all(|v| *v >= 0.0 && v.is_finite()));
    }

    #[test]
    fn profile_distance_is_euclidean(c in attributes(), j in attributes()) {
        let f = derive_features(&c, &j);
        let expected = (f.diff_authority.powi(2)
            + f.diff_prestige.powi(2)
            + f.diff_security.powi(2)
            + f.diff_formality.powi(2))
        .sqrt();
        prop_assert!((f.profile_distance - expected).abs() < 1e-9);
    }

    #[test]
    fn identical_records_have_zero_features(c in attributes()) {
        prop_assert_eq!(derive_features(&c, &c), FeatureVector::default());
    }

    #[test]
    fn aspect_score_stays_in_range(diff in 0.0..1e6f64, penalty in 0.0..1e3f64) {
        let score = aspect_score(diff, penalty);
        prop_assert!((0.0..=100.0).contains(&score), "score {}", score);
    }

    #[test]
    fn composite_stays_in_range(
        c in attributes(),
        j in attributes(),
        w in weights(),
        p in penalties(),
    ) {
        let scores = aspect_scores(&derive_features(&c, &j), &p);
        let composite = composite_score(&scores, &w);
        prop_assert!(composite >= -1e-9 && composite <= 100.0 + 1e-9, "composite {}", composite);
    }

    #[test]
    fn top_k_is_partial_sort(keys in prop::collection::vec(0.0..100.0f64, 0..60), k in 1usize..15) {
        let picked = top_k_indices(&keys, k);
        prop_assert_eq!(picked.len(), k.min(keys.len()));
        let floor = picked.iter().map(|&i| keys[i]).fold(f64::INFINITY, f64::min);
        for (i, key) in keys.iter().enumerate() {
            if !picked.contains(&i) {
                prop_assert!(*key <= floor);
            }
        }
        prop_assert!(picked.windows(2).all(|w| keys[w[0]] >= keys[w[1]]));
    }
}
