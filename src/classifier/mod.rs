//! Trained classifier ensemble.
//!
//! Training flattens every enrolled user's n-gram feature maps into rows of
//! a fixed column space (the persisted [`FeatureSchema`]), standardizes them,
//! and fits two classifiers: a distance-based neighbor classifier and a
//! margin-based linear classifier. A shuffled 80/20 hold-out split measures
//! validation accuracy (logged, not surfaced) with a scaler fit on the
//! training split alone, after which scaler and classifiers are refit on the
//! full row set for the persisted model.
//!
//! At inference the two classifiers vote: agreement averages their top-class
//! probabilities; disagreement defers to whichever model is more confident,
//! reporting that probability verbatim. The per-class scores backing the
//! shortlist follow the same rule, so the winner always ranks first.

pub mod knn;
pub mod linear;
pub mod scaler;
pub mod schema;

pub use knn::KnnClassifier;
pub use linear::LinearClassifier;
pub use scaler::StandardScaler;
pub use schema::{FeatureSchema, SCHEMA_VERSION};

use crate::config::IdentifyConfig;
use crate::error::{IdentifyError, Result};
use crate::features::NgramFeatureMap;
use crate::profile::NgramProfile;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Deterministic hold-out split.
const SPLIT_SEED: u64 = 7;

/// Persisted model artifact: schema, scaler, and both fitted classifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub schema: FeatureSchema,
    pub scaler: StandardScaler,
    pub knn: KnnClassifier,
    pub linear: LinearClassifier,
    /// Class index -> username.
    pub classes: Vec<String>,
    pub trained_at: DateTime<Utc>,
}

/// Outcome of one ensemble inference.
#[derive(Debug, Clone)]
pub struct EnsemblePrediction {
    /// Predicted username.
    pub user: String,
    /// Confidence per the agree/disagree rule.
    pub confidence: f64,
    /// Per-class probabilities backing the verdict, one entry per enrolled
    /// class: averaged when the classifiers agree, the winning model's when
    /// they disagree. Ranking these always puts the predicted user first
    /// with `confidence` as its score.
    pub class_probabilities: Vec<(String, f64)>,
}

impl TrainedModel {
    /// Train the ensemble over every enrolled user's n-gram feature maps.
    pub fn train(
        profiles: &BTreeMap<String, NgramProfile>,
        config: &IdentifyConfig,
    ) -> Result<Self> {
        let classes: Vec<String> = profiles.keys().cloned().collect();
        let mut maps: Vec<&NgramFeatureMap> = Vec::new();
        let mut labels: Vec<usize> = Vec::new();
        for (label, profile) in profiles.values().enumerate() {
            for map in &profile.feature_maps {
                maps.push(map);
                labels.push(label);
            }
        }

        if maps.len() < config.min_training_samples {
            return Err(IdentifyError::InsufficientTrainingData {
                have: maps.len(),
                need: config.min_training_samples,
            });
        }

        let schema = FeatureSchema::from_maps(maps.iter().copied());
        let projected: Vec<Vec<Option<f64>>> =
            maps.iter().map(|map| schema.project(map)).collect();

        // Internal validation on a shuffled hold-out split. The validation
        // scaler is fit on the training split alone, so the held-out rows
        // contribute nothing to the statistics they are scored against.
        let mut order: Vec<usize> = (0..projected.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(SPLIT_SEED));
        let holdout = ((projected.len() as f64 * config.holdout_fraction) as usize)
            .min(projected.len().saturating_sub(1));
        let (test_idx, train_idx) = order.split_at(holdout);

        if !test_idx.is_empty() {
            let train_projected: Vec<Vec<Option<f64>>> =
                train_idx.iter().map(|&i| projected[i].clone()).collect();
            let val_scaler = StandardScaler::fit(&train_projected, schema.len());
            let train_rows: Vec<Vec<f64>> = train_projected
                .iter()
                .map(|row| val_scaler.transform(row))
                .collect();
            let train_labels: Vec<usize> = train_idx.iter().map(|&i| labels[i]).collect();
            let knn = KnnClassifier::fit(config.knn_k, train_rows.clone(), train_labels.clone());
            let linear = LinearClassifier::fit(&train_rows, &train_labels, classes.len());

            let knn_correct = test_idx
                .iter()
                .filter(|&&i| {
                    let row = val_scaler.transform(&projected[i]);
                    argmax(&knn.predict_proba(&row, classes.len())) == labels[i]
                })
                .count();
            let linear_correct = test_idx
                .iter()
                .filter(|&&i| {
                    let row = val_scaler.transform(&projected[i]);
                    argmax(&linear.predict_proba(&row)) == labels[i]
                })
                .count();
            log::info!(
                "ensemble training: {} rows, {} classes; holdout accuracy knn {}/{}, linear {}/{}",
                projected.len(),
                classes.len(),
                knn_correct,
                test_idx.len(),
                linear_correct,
                test_idx.len()
            );
        }

        // Refit scaler and both classifiers on the full row set for the
        // persisted model.
        let scaler = StandardScaler::fit(&projected, schema.len());
        let rows: Vec<Vec<f64>> = projected.iter().map(|row| scaler.transform(row)).collect();
        let knn = KnnClassifier::fit(config.knn_k, rows.clone(), labels.clone());
        let linear = LinearClassifier::fit(&rows, &labels, classes.len());

        Ok(Self {
            schema,
            scaler,
            knn,
            linear,
            classes,
            trained_at: Utc::now(),
        })
    }

    /// Run both classifiers and combine their predictions.
    pub fn predict(&self, features: &NgramFeatureMap) -> EnsemblePrediction {
        let row = self.scaler.transform(&self.schema.project(features));

        let knn_probs = self.knn.predict_proba(&row, self.classes.len());
        let linear_probs = self.linear.predict_proba(&row);

        let knn_top = argmax(&knn_probs);
        let linear_top = argmax(&linear_probs);

        // On agreement the averaged vector's maximum is the shared top class,
        // so the per-class scores can be averaged. On disagreement the
        // averaged vector may rank a third class above the winner, so the
        // winning model's own probabilities back the scores instead.
        let (winner, confidence, backing) = if knn_top == linear_top {
            let averaged: Vec<f64> = knn_probs
                .iter()
                .zip(linear_probs.iter())
                .map(|(a, b)| (a + b) / 2.0)
                .collect();
            let confidence = (knn_probs[knn_top] + linear_probs[linear_top]) / 2.0;
            (knn_top, confidence, averaged)
        } else if knn_probs[knn_top] >= linear_probs[linear_top] {
            (knn_top, knn_probs[knn_top], knn_probs)
        } else {
            (linear_top, linear_probs[linear_top], linear_probs)
        };

        let class_probabilities = self
            .classes
            .iter()
            .zip(backing.iter())
            .map(|(user, prob)| (user.clone(), *prob))
            .collect();

        EnsemblePrediction {
            user: self.classes[winner].clone(),
            confidence,
            class_probabilities,
        }
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Persist the model atomically: write a temporary sibling file, then
    /// rename it into place so a crash mid-write never leaves a torn artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load the persisted model if present. A missing or unreadable artifact
    /// is absence, never an error; corruption is logged and triggers
    /// retraining upstream.
    pub fn load_if_present(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match fs::read(path).map_err(anyhow::Error::from).and_then(|bytes| {
            serde_json::from_slice::<Self>(&bytes).map_err(anyhow::Error::from)
        }) {
            Ok(model) => Some(model),
            Err(e) => {
                log::warn!("Discarding unreadable model at {}: {e}", path.display());
                None
            }
        }
    }
}

/// Index of the largest probability; exact ties go to the lowest index, the
/// same order a stable descending sort over the classes would produce.
fn argmax(probs: &[f64]) -> usize {
    let mut best = 0;
    for (i, p) in probs.iter().enumerate().skip(1) {
        if *p > probs[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, f64)]) -> NgramFeatureMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    /// Two users with well-separated digraph timings, six samples each.
    fn training_profiles() -> BTreeMap<String, NgramProfile> {
        let mut profiles = BTreeMap::new();
        let alice: Vec<NgramFeatureMap> = (0..6)
            .map(|i| {
                let jitter = i as f64;
                map(&[
                    ("digraph_th_mean", 50.0 + jitter),
                    ("digraph_th_std", 5.0),
                    ("digraph_he_mean", 45.0 + jitter),
                    ("digraph_he_std", 4.0),
                ])
            })
            .collect();
        let bob: Vec<NgramFeatureMap> = (0..6)
            .map(|i| {
                let jitter = i as f64;
                map(&[
                    ("digraph_th_mean", 120.0 + jitter),
                    ("digraph_th_std", 15.0),
                    ("digraph_he_mean", 110.0 + jitter),
                    ("digraph_he_std", 12.0),
                ])
            })
            .collect();
        profiles.insert(
            "alice".to_string(),
            NgramProfile {
                username: "alice".to_string(),
                feature_maps: alice,
            },
        );
        profiles.insert(
            "bob".to_string(),
            NgramProfile {
                username: "bob".to_string(),
                feature_maps: bob,
            },
        );
        profiles
    }

    #[test]
    fn test_training_requires_minimum_rows() {
        let mut profiles = training_profiles();
        profiles.get_mut("alice").unwrap().feature_maps.truncate(2);
        profiles.get_mut("bob").unwrap().feature_maps.truncate(2);

        let err = TrainedModel::train(&profiles, &IdentifyConfig::default()).unwrap_err();
        match err {
            IdentifyError::InsufficientTrainingData { have, need } => {
                assert_eq!(have, 4);
                assert_eq!(need, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_training_set_sample_predicts_own_label() {
        let profiles = training_profiles();
        let model = TrainedModel::train(&profiles, &IdentifyConfig::default()).unwrap();

        for (user, profile) in &profiles {
            for features in &profile.feature_maps {
                let prediction = model.predict(features);
                assert_eq!(&prediction.user, user);
            }
        }
    }

    #[test]
    fn test_agreement_averages_confidences() {
        let profiles = training_profiles();
        let model = TrainedModel::train(&profiles, &IdentifyConfig::default()).unwrap();

        // A point well inside alice's cluster: both classifiers agree.
        let features = map(&[
            ("digraph_th_mean", 52.0),
            ("digraph_th_std", 5.0),
            ("digraph_he_mean", 47.0),
            ("digraph_he_std", 4.0),
        ]);
        let prediction = model.predict(&features);

        let knn_probs = model.knn.predict_proba(
            &model.scaler.transform(&model.schema.project(&features)),
            model.classes.len(),
        );
        let lin_probs = model
            .linear
            .predict_proba(&model.scaler.transform(&model.schema.project(&features)));

        assert_eq!(prediction.user, "alice");
        let expected = (knn_probs[0].max(knn_probs[1]) + lin_probs[0].max(lin_probs[1])) / 2.0;
        assert!((prediction.confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn test_disagreement_reports_winning_model_verbatim() {
        // Hand-built model whose classifiers cannot agree: the neighbor
        // classifier memorized only alice points, while the linear separators
        // were fit on bob rows alone and score bob everywhere.
        let schema = FeatureSchema {
            version: SCHEMA_VERSION,
            keys: vec!["digraph_th_mean".to_string()],
        };
        let scaler = StandardScaler {
            means: vec![0.0],
            std_devs: vec![1.0],
        };
        let knn = KnnClassifier::fit(3, vec![vec![0.0]], vec![0]);
        let linear = LinearClassifier::fit(&[vec![-1.0], vec![1.0]], &[1, 1], 2);
        let model = TrainedModel {
            schema,
            scaler,
            knn,
            linear,
            classes: vec!["alice".to_string(), "bob".to_string()],
            trained_at: Utc::now(),
        };

        let features = map(&[("digraph_th_mean", 0.0)]);
        let row = model.scaler.transform(&model.schema.project(&features));
        let knn_probs = model.knn.predict_proba(&row, 2);
        let linear_probs = model.linear.predict_proba(&row);
        assert!(knn_probs[0] > knn_probs[1]);
        assert!(linear_probs[1] > linear_probs[0]);
        // The neighbor classifier is the more confident model here.
        assert!(knn_probs[0] >= linear_probs[1]);

        let prediction = model.predict(&features);
        assert_eq!(prediction.user, "alice");
        assert_eq!(prediction.confidence, knn_probs[0]);
        // The per-class scores come from the winning model, not an average,
        // so ranking them always puts the predicted user first with the
        // verdict confidence as its score.
        assert_eq!(
            prediction.class_probabilities[0],
            ("alice".to_string(), knn_probs[0])
        );
        assert_eq!(
            prediction.class_probabilities[1],
            ("bob".to_string(), knn_probs[1])
        );
        assert!(prediction.class_probabilities[0].1 > prediction.class_probabilities[1].1);
    }

    #[test]
    fn test_persisted_scaler_refit_on_full_set() {
        let profiles = training_profiles();
        let model = TrainedModel::train(&profiles, &IdentifyConfig::default()).unwrap();

        // The hold-out pass fits its own scaler on the training split; the
        // persisted scaler must still cover every row.
        let projected: Vec<Vec<Option<f64>>> = profiles
            .values()
            .flat_map(|p| p.feature_maps.iter())
            .map(|m| model.schema.project(m))
            .collect();
        let expected = StandardScaler::fit(&projected, model.schema.len());

        assert_eq!(model.scaler.means, expected.means);
        assert_eq!(model.scaler.std_devs, expected.std_devs);
    }

    #[test]
    fn test_unseen_keys_are_reindexed_onto_schema() {
        let profiles = training_profiles();
        let model = TrainedModel::train(&profiles, &IdentifyConfig::default()).unwrap();

        // Live sample with one trained key missing and one never-seen key.
        let features = map(&[
            ("digraph_th_mean", 51.0),
            ("digraph_he_mean", 46.0),
            ("trigraph_xyz_mean", 400.0),
        ]);
        let prediction = model.predict(&features);
        assert_eq!(prediction.user, "alice");
    }

    #[test]
    fn test_confidence_in_unit_interval() {
        let profiles = training_profiles();
        let model = TrainedModel::train(&profiles, &IdentifyConfig::default()).unwrap();

        let prediction = model.predict(&map(&[
            ("digraph_th_mean", 85.0),
            ("digraph_he_mean", 80.0),
        ]));
        assert!(prediction.confidence >= 0.0 && prediction.confidence <= 1.0);
        let total: f64 = prediction
            .class_probabilities
            .iter()
            .map(|(_, p)| p)
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_save_load_roundtrip_preserves_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let profiles = training_profiles();
        let model = TrainedModel::train(&profiles, &IdentifyConfig::default()).unwrap();
        model.save(&path).unwrap();

        let loaded = TrainedModel::load_if_present(&path).unwrap();
        assert_eq!(loaded.classes, model.classes);
        assert_eq!(loaded.schema.keys, model.schema.keys);

        let features = &profiles["bob"].feature_maps[0];
        assert_eq!(loaded.predict(features).user, model.predict(features).user);
    }

    #[test]
    fn test_corrupt_artifact_is_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "not a model").unwrap();

        assert!(TrainedModel::load_if_present(&path).is_none());
        assert!(TrainedModel::load_if_present(&dir.path().join("missing.json")).is_none());
    }
}
