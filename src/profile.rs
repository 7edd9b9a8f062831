//! Per-user profiles and the history collaborator.
//!
//! Profiles are pure functions of the supplied history: they are rebuilt
//! from scratch on every identification call and never cached, so a profile
//! always reflects the current sample set. Users whose history contains no
//! usable sample for a given method get no profile at all rather than a
//! degenerate one.
//!
//! Profiles are keyed by username in a `BTreeMap`, so every scan over them
//! runs in lexicographic username order. Best-user selection uses strict
//! comparison, which makes ties resolve to the lexicographically smallest
//! username.

use crate::features::{self, NgramFeatureMap, SummaryVector, SUMMARY_DIMS};
use crate::sample::{TypingSample, UserHistory};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Statistical profile: one summary vector per usable historical sample.
#[derive(Debug, Clone)]
pub struct StatisticalProfile {
    pub username: String,
    pub vectors: Vec<SummaryVector>,
}

impl StatisticalProfile {
    /// Per-dimension mean over the historical vectors.
    pub fn mean_vector(&self) -> SummaryVector {
        let n = self.vectors.len() as f64;
        let mut mean = [0.0; SUMMARY_DIMS];
        for vec in &self.vectors {
            for (m, v) in mean.iter_mut().zip(vec.iter()) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }
        mean
    }

    /// Per-dimension population standard deviation (divide by N).
    pub fn std_vector(&self) -> SummaryVector {
        let n = self.vectors.len() as f64;
        let mean = self.mean_vector();
        let mut var = [0.0; SUMMARY_DIMS];
        for vec in &self.vectors {
            for i in 0..SUMMARY_DIMS {
                let d = vec[i] - mean[i];
                var[i] += d * d;
            }
        }
        let mut std = [0.0; SUMMARY_DIMS];
        for i in 0..SUMMARY_DIMS {
            std[i] = (var[i] / n).sqrt();
        }
        std
    }
}

/// N-gram profile: one sparse feature map per usable historical sample.
#[derive(Debug, Clone)]
pub struct NgramProfile {
    pub username: String,
    pub feature_maps: Vec<NgramFeatureMap>,
}

/// Build statistical profiles for every enrolled user with at least one
/// sample carrying all three timing sequences.
pub fn build_statistical_profiles(
    history: &[UserHistory],
) -> BTreeMap<String, StatisticalProfile> {
    let mut profiles = BTreeMap::new();
    for user in history {
        let vectors: Vec<SummaryVector> = user
            .samples
            .iter()
            .filter_map(features::summary_vector)
            .collect();
        if !vectors.is_empty() {
            profiles.insert(
                user.username.clone(),
                StatisticalProfile {
                    username: user.username.clone(),
                    vectors,
                },
            );
        }
    }
    profiles
}

/// Build n-gram profiles for every enrolled user with at least one sample
/// producing a non-empty feature map.
pub fn build_ngram_profiles(history: &[UserHistory]) -> BTreeMap<String, NgramProfile> {
    let mut profiles = BTreeMap::new();
    for user in history {
        let feature_maps: Vec<NgramFeatureMap> = user
            .samples
            .iter()
            .map(features::extract_ngram_features)
            .filter(|map| !map.is_empty())
            .collect();
        if !feature_maps.is_empty() {
            profiles.insert(
                user.username.clone(),
                NgramProfile {
                    username: user.username.clone(),
                    feature_maps,
                },
            );
        }
    }
    profiles
}

// =============================================================================
// History Store
// =============================================================================

/// Collaborator supplying the full enrolled history.
///
/// The engine only ever asks for the complete current history; persistence
/// mechanics stay behind this seam.
pub trait HistoryStore: Send + Sync {
    /// Read every enrolled user's historical samples.
    fn load_history(&self) -> Result<Vec<UserHistory>>;
}

/// Directory of per-user JSON files (`<username>.json`), each holding
/// `{"username": ..., "samples": [...]}` as written by the capture layer.
pub struct JsonHistoryStore {
    data_dir: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Append a sample to a user's history file, creating it on first use.
    ///
    /// The rewrite goes through a temporary sibling file renamed into place,
    /// so a crash mid-write cannot tear the existing history.
    pub fn append_sample(&self, username: &str, sample: TypingSample) -> Result<()> {
        if username.is_empty() {
            return Err(anyhow!("no username provided"));
        }
        fs::create_dir_all(&self.data_dir)?;

        let path = self.user_path(username);
        let mut history = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            UserHistory::new(username)
        };

        history.samples.push(sample);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&history)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn user_path(&self, username: &str) -> PathBuf {
        self.data_dir.join(format!("{username}.json"))
    }

    fn load_user_file(path: &Path) -> Result<UserHistory> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load_history(&self) -> Result<Vec<UserHistory>> {
        let mut histories = Vec::new();

        if !self.data_dir.exists() {
            return Ok(histories);
        }

        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match Self::load_user_file(&path) {
                Ok(history) => histories.push(history),
                Err(e) => {
                    // One bad file must not take down the whole read.
                    log::warn!("Skipping unreadable history file {}: {e}", path.display());
                }
            }
        }

        Ok(histories)
    }
}
