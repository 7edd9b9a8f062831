//! Raw typing samples and per-user history.
//!
//! A [`TypingSample`] is the atomic unit of typing evidence produced by the
//! external capture layer: ordered hold / flight / down-down durations in
//! milliseconds, the typed transcript, and an optional per-n-gram timing map.
//! Capture metadata (wpm, accuracy, ...) is carried along so real history
//! files round-trip, but plays no part in identification.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-n-gram observed durations, keyed by the 2- or 3-character substring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NgramData {
    #[serde(default)]
    pub digraphs: HashMap<String, Vec<f64>>,
    #[serde(default)]
    pub trigraphs: HashMap<String, Vec<f64>>,
}

impl NgramData {
    /// True when neither timing map holds any n-gram.
    pub fn is_empty(&self) -> bool {
        self.digraphs.is_empty() && self.trigraphs.is_empty()
    }
}

/// One captured typing sample.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypingSample {
    /// Free-text transcript of what was typed.
    #[serde(default)]
    pub text: String,

    /// Key hold durations (ms), in keystroke order.
    #[serde(default)]
    pub hold_times: Vec<f64>,

    /// Release-to-next-press flight durations (ms).
    #[serde(default)]
    pub flight_times: Vec<f64>,

    /// Press-to-press intervals (ms).
    #[serde(default)]
    pub down_down_times: Vec<f64>,

    /// Optional per-digraph/trigraph timing observations.
    #[serde(default)]
    pub ngram_data: NgramData,

    // Capture metadata, preserved verbatim from the capture layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl TypingSample {
    /// Usable for the statistical method: all three timing sequences present.
    pub fn has_summary_timings(&self) -> bool {
        !self.hold_times.is_empty()
            && !self.flight_times.is_empty()
            && !self.down_down_times.is_empty()
    }

    /// Usable for the n-gram and ML methods: n-gram timing data present.
    pub fn has_ngram_data(&self) -> bool {
        !self.ngram_data.is_empty()
    }
}

/// All historical samples for one enrolled user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserHistory {
    pub username: String,
    #[serde(default)]
    pub samples: Vec<TypingSample>,
}

impl UserHistory {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            samples: Vec::new(),
        }
    }
}
