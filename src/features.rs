//! Feature extraction from raw typing samples.
//!
//! Two representations are derived from a [`TypingSample`]:
//!
//! - a fixed 6-dimensional summary vector
//!   `[mean(hold), std(hold), mean(flight), std(flight), mean(dd), std(dd)]`
//! - a sparse n-gram feature map keyed `<kind>_<ngram>_<mean|std>`
//!
//! Standard deviations are population deviations (divide by N), matching the
//! profile-side statistics so acceptance bands line up.

use crate::sample::TypingSample;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Dimensionality of the summary vector. Component order is fixed and must
/// match across every vector compared.
pub const SUMMARY_DIMS: usize = 6;

/// Fixed-length summary vector over one sample's timing sequences.
pub type SummaryVector = [f64; SUMMARY_DIMS];

/// Sparse per-n-gram feature map. A `BTreeMap` keeps key iteration in
/// lexicographic order, which the classifier ensemble relies on for a stable
/// feature-column ordering.
pub type NgramFeatureMap = BTreeMap<String, f64>;

/// Compute the 6-d summary vector for a sample.
///
/// Returns `None` when any timing sequence is empty; mean/std of an empty
/// sequence is undefined and callers treat such samples as unusable for the
/// statistical method.
pub fn summary_vector(sample: &TypingSample) -> Option<SummaryVector> {
    if !sample.has_summary_timings() {
        return None;
    }
    Some([
        mean(&sample.hold_times),
        population_std(&sample.hold_times),
        mean(&sample.flight_times),
        population_std(&sample.flight_times),
        mean(&sample.down_down_times),
        population_std(&sample.down_down_times),
    ])
}

/// Extract the sparse n-gram feature map for a sample.
///
/// Every digraph/trigraph with at least one observed duration contributes a
/// `_mean` and a `_std` feature; n-grams with an empty duration list are
/// skipped. An empty result means the n-gram and ML methods are unavailable
/// for this sample, not that it matches nothing.
pub fn extract_ngram_features(sample: &TypingSample) -> NgramFeatureMap {
    let mut features = NgramFeatureMap::new();
    insert_ngram_stats(&mut features, "digraph", &sample.ngram_data.digraphs);
    insert_ngram_stats(&mut features, "trigraph", &sample.ngram_data.trigraphs);
    features
}

fn insert_ngram_stats(
    features: &mut NgramFeatureMap,
    kind: &str,
    timings: &std::collections::HashMap<String, Vec<f64>>,
) {
    for (ngram, durations) in timings {
        if durations.is_empty() {
            continue;
        }
        features.insert(format!("{kind}_{ngram}_mean"), mean(durations));
        features.insert(format!("{kind}_{ngram}_std"), population_std(durations));
    }
}

/// Arithmetic mean of a non-empty slice.
pub fn mean(data: &[f64]) -> f64 {
    data.iter().mean()
}

/// Population standard deviation (divide by N, not N-1) of a non-empty slice.
pub fn population_std(data: &[f64]) -> f64 {
    data.iter().population_std_dev()
}
