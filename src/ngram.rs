//! N-gram timing similarity comparator.
//!
//! A sample's sparse feature map is compared against each historical map of
//! a candidate user over the keys present in both. Per shared key the score
//! is a relative-difference similarity clipped to [0, 1], with a floor of 1
//! on the denominator so near-zero profile values cannot blow the ratio up.
//! Historical maps sharing no key contribute nothing (skipped, not zero),
//! and users with no comparable historical sample are left out of the
//! ranking entirely.

use crate::config::IdentifyConfig;
use crate::decision::{self, Analysis, MatchResult, Verdict};
use crate::features::NgramFeatureMap;
use crate::profile::NgramProfile;
use std::collections::BTreeMap;

/// Relative-difference similarity for one shared feature key.
pub fn feature_similarity(sample_value: f64, profile_value: f64) -> f64 {
    let denom = profile_value.abs().max(1.0);
    (1.0 - (sample_value - profile_value).abs() / denom).max(0.0)
}

/// Mean similarity over the keys shared by sample and one historical map.
/// `None` when the key intersection is empty.
fn map_similarity(sample: &NgramFeatureMap, historical: &NgramFeatureMap) -> Option<f64> {
    let mut total = 0.0;
    let mut shared = 0usize;
    for (key, &a) in sample {
        if let Some(&b) = historical.get(key) {
            total += feature_similarity(a, b);
            shared += 1;
        }
    }
    (shared > 0).then(|| total / shared as f64)
}

/// Mean similarity over the user's comparable historical samples.
/// `None` when no historical sample shares any key with the sample.
pub fn profile_similarity(sample: &NgramFeatureMap, profile: &NgramProfile) -> Option<f64> {
    let scores: Vec<f64> = profile
        .feature_maps
        .iter()
        .filter_map(|map| map_similarity(sample, map))
        .collect();
    (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Score a sample's feature map against every n-gram profile and produce the
/// ranked verdict.
pub fn identify(
    sample: &NgramFeatureMap,
    profiles: &BTreeMap<String, NgramProfile>,
    config: &IdentifyConfig,
) -> Verdict {
    let mut best_user: Option<&str> = None;
    let mut best_score = 0.0;
    let mut matches = Vec::new();

    for (user, profile) in profiles {
        let Some(score) = profile_similarity(sample, profile) else {
            continue;
        };
        log::debug!("ngram: {user} similarity {score:.3}");

        matches.push(MatchResult {
            user: user.clone(),
            acceptance: score,
            method: format!("N-gram timing similarity: {:.1}%", score * 100.0),
        });

        if score > best_score || best_user.is_none() {
            best_score = score;
            best_user = Some(user);
        }
    }

    if matches.is_empty() {
        return Verdict::no_profiles("ngram");
    }

    let all_matches = decision::rank_matches(matches, config.shortlist_len);
    let user = decision::apply_threshold(
        best_user.unwrap_or(decision::UNKNOWN_USER),
        best_score,
        Some(config.ngram_threshold),
    );

    Verdict {
        user,
        acceptance: best_score,
        analysis: Analysis::empty(),
        all_matches,
        method: "ngram".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{NO_PROFILES_FOUND, UNKNOWN_USER};

    fn map(entries: &[(&str, f64)]) -> NgramFeatureMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    fn profiles_from(users: &[(&str, Vec<NgramFeatureMap>)]) -> BTreeMap<String, NgramProfile> {
        users
            .iter()
            .map(|(user, maps)| {
                (
                    user.to_string(),
                    NgramProfile {
                        username: user.to_string(),
                        feature_maps: maps.clone(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_identical_values_score_one() {
        assert_eq!(feature_similarity(50.0, 50.0), 1.0);
        assert_eq!(feature_similarity(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_similarity_clipped_at_zero() {
        assert_eq!(feature_similarity(500.0, 50.0), 0.0);
    }

    #[test]
    fn test_denominator_floor_near_zero() {
        // |b| = 0.1 floors to 1.0; similarity is 1 - 0.4/1.0, not 1 - 0.4/0.1.
        assert!((feature_similarity(0.5, 0.1) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_historical_map_is_skipped() {
        let sample = map(&[("digraph_th_mean", 50.0)]);
        let profile = NgramProfile {
            username: "alice".to_string(),
            feature_maps: vec![
                map(&[("digraph_qu_mean", 60.0)]), // no shared key: skipped
                map(&[("digraph_th_mean", 50.0)]),
            ],
        };

        // Only the comparable map participates; it matches exactly.
        assert_eq!(profile_similarity(&sample, &profile), Some(1.0));
    }

    #[test]
    fn test_user_without_comparable_samples_excluded() {
        let sample = map(&[("digraph_th_mean", 50.0)]);
        let profiles = profiles_from(&[
            ("alice", vec![map(&[("digraph_th_mean", 50.0)])]),
            ("bob", vec![map(&[("digraph_zz_mean", 80.0)])]),
        ]);

        let verdict = identify(&sample, &profiles, &IdentifyConfig::default());
        assert_eq!(verdict.user, "alice");
        assert_eq!(verdict.all_matches.len(), 1);
    }

    #[test]
    fn test_no_comparable_profiles_is_cold_start() {
        let sample = map(&[("digraph_th_mean", 50.0)]);
        let profiles = profiles_from(&[("bob", vec![map(&[("digraph_zz_mean", 80.0)])])]);

        let verdict = identify(&sample, &profiles, &IdentifyConfig::default());
        assert_eq!(verdict.user, NO_PROFILES_FOUND);
        assert_eq!(verdict.acceptance, 0.0);
    }

    #[test]
    fn test_below_threshold_yields_sentinel() {
        let sample = map(&[("digraph_th_mean", 50.0)]);
        // 1 - |50-90|/90 = 0.556 < 0.6
        let profiles = profiles_from(&[("alice", vec![map(&[("digraph_th_mean", 90.0)])])]);

        let verdict = identify(&sample, &profiles, &IdentifyConfig::default());
        assert_eq!(verdict.user, UNKNOWN_USER);
        assert!(verdict.acceptance > 0.0 && verdict.acceptance < 0.6);
        assert_eq!(verdict.all_matches.len(), 1);
    }

    #[test]
    fn test_analysis_is_empty_for_ngram() {
        let sample = map(&[("digraph_th_mean", 50.0)]);
        let profiles = profiles_from(&[("alice", vec![map(&[("digraph_th_mean", 50.0)])])]);

        let verdict = identify(&sample, &profiles, &IdentifyConfig::default());
        assert!(verdict.analysis.as_statistical().is_none());
    }

    #[test]
    fn test_score_in_unit_interval() {
        let sample = map(&[("digraph_th_mean", 10.0), ("digraph_he_mean", 400.0)]);
        let profiles = profiles_from(&[(
            "alice",
            vec![map(&[("digraph_th_mean", 300.0), ("digraph_he_mean", 395.0)])],
        )]);

        let verdict = identify(&sample, &profiles, &IdentifyConfig::default());
        assert!(verdict.acceptance >= 0.0 && verdict.acceptance <= 1.0);
    }
}
