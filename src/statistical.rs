//! Statistical acceptance-interval comparator.
//!
//! Each enrolled user's historical summary vectors yield a per-dimension
//! mean and population standard deviation. A sample is scored against a user
//! by the fraction of its six summary features falling inside
//! `mean ± multiplier * std` — a per-feature tolerance band, not a joint
//! distance metric. A zero-deviation dimension (single historical sample or
//! zero variance) accepts only an exact match; that strictness is intended.

use crate::config::IdentifyConfig;
use crate::decision::{
    self, Analysis, MatchResult, StatisticalBreakdown, Verdict,
};
use crate::features::{SummaryVector, SUMMARY_DIMS};
use crate::profile::StatisticalProfile;
use std::collections::BTreeMap;

/// Fraction of summary features within `multiplier` standard deviations of
/// the profile mean.
pub fn acceptance_fraction(
    sample: &SummaryVector,
    mean: &SummaryVector,
    std: &SummaryVector,
    multiplier: f64,
) -> f64 {
    let within = sample
        .iter()
        .zip(mean.iter().zip(std.iter()))
        .filter(|(s, (m, sd))| (**s - **m).abs() <= multiplier * **sd)
        .count();
    within as f64 / SUMMARY_DIMS as f64
}

/// Score a sample vector against every statistical profile and produce the
/// ranked verdict.
pub fn identify(
    sample: &SummaryVector,
    profiles: &BTreeMap<String, StatisticalProfile>,
    config: &IdentifyConfig,
) -> Verdict {
    let mut best_user: Option<&str> = None;
    let mut best_accept = 0.0;
    let mut matches = Vec::with_capacity(profiles.len());

    for (user, profile) in profiles {
        let mean = profile.mean_vector();
        let std = profile.std_vector();
        let accept = acceptance_fraction(sample, &mean, &std, config.std_multiplier);
        log::debug!("statistical: {user} acceptance {accept:.3}");

        matches.push(MatchResult {
            user: user.clone(),
            acceptance: accept,
            method: format!(
                "Acceptance % within {} std: {:.1}%",
                config.std_multiplier,
                accept * 100.0
            ),
        });

        // Strict comparison over lexicographic iteration: ties resolve to
        // the smallest username.
        if accept > best_accept || best_user.is_none() {
            best_accept = accept;
            best_user = Some(user);
        }
    }

    let all_matches = decision::rank_matches(matches, config.shortlist_len);
    let user = decision::apply_threshold(
        best_user.unwrap_or(decision::UNKNOWN_USER),
        best_accept,
        Some(config.statistical_threshold),
    );

    Verdict {
        user,
        acceptance: best_accept,
        analysis: Analysis::Statistical(StatisticalBreakdown {
            avg_hold: sample[0],
            std_hold: sample[1],
            avg_flight: sample[2],
            std_flight: sample[3],
            avg_dd: sample[4],
            std_dd: sample[5],
            acceptance_percentage: best_accept,
        }),
        all_matches,
        method: "statistical".to_string(),
    }
}
