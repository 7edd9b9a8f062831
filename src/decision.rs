//! Decision layer shared by all identification methods.
//!
//! Per-user scores become a ranked shortlist; the best entry is compared
//! against the method's acceptance threshold to decide between a named user
//! and the "Unknown User" sentinel. The best score and shortlist are always
//! reported, even when the sentinel wins.

use serde::{Deserialize, Serialize};

/// Verdict user when no enrolled profile met the acceptance threshold.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Verdict user when no enrolled profile exists at all (cold start).
pub const NO_PROFILES_FOUND: &str = "No profiles found";

/// One candidate user's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// Candidate username.
    pub user: String,
    /// Acceptance score in [0, 1].
    pub acceptance: f64,
    /// Human-readable description of how the score was computed.
    pub method: String,
}

/// Method-specific analysis attached to a verdict. Only the statistical
/// method has a breakdown; the other methods carry no analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Analysis {
    Statistical(StatisticalBreakdown),
    Empty {},
}

impl Analysis {
    pub fn empty() -> Self {
        Analysis::Empty {}
    }

    pub fn as_statistical(&self) -> Option<&StatisticalBreakdown> {
        match self {
            Analysis::Statistical(breakdown) => Some(breakdown),
            Analysis::Empty {} => None,
        }
    }
}

/// The six raw summary values of the classified sample plus the winning
/// acceptance fraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticalBreakdown {
    pub avg_hold: f64,
    pub std_hold: f64,
    pub avg_flight: f64,
    pub std_flight: f64,
    pub avg_dd: f64,
    pub std_dd: f64,
    pub acceptance_percentage: f64,
}

/// Final identification verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Best-matching user, or one of the sentinel values.
    pub user: String,
    /// Acceptance score of the best match (0.0 on cold start).
    pub acceptance: f64,
    /// Method-dependent analysis; empty for n-gram and ML.
    pub analysis: Analysis,
    /// Ranked shortlist, non-increasing by acceptance, at most the
    /// configured shortlist length.
    pub all_matches: Vec<MatchResult>,
    /// Echo of the requested method selector.
    pub method: String,
}

impl Verdict {
    /// Cold-start verdict: no enrolled profiles exist for this method.
    pub fn no_profiles(method: &str) -> Self {
        Self {
            user: NO_PROFILES_FOUND.to_string(),
            acceptance: 0.0,
            analysis: Analysis::empty(),
            all_matches: Vec::new(),
            method: method.to_string(),
        }
    }
}

/// Sort matches by descending acceptance and truncate to the shortlist
/// length. Equal scores keep their input order, so callers scanning
/// profiles in lexicographic username order get a deterministic ranking.
pub fn rank_matches(mut matches: Vec<MatchResult>, shortlist_len: usize) -> Vec<MatchResult> {
    matches.sort_by(|a, b| {
        b.acceptance
            .partial_cmp(&a.acceptance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(shortlist_len);
    matches
}

/// Apply the method threshold: the best user is named only when its score
/// meets the threshold, otherwise the sentinel is returned. `None` disables
/// thresholding.
pub fn apply_threshold(best_user: &str, best_score: f64, threshold: Option<f64>) -> String {
    match threshold {
        Some(t) if best_score < t => UNKNOWN_USER.to_string(),
        _ => best_user.to_string(),
    }
}
