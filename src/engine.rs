//! Request-level orchestration.
//!
//! [`IdentifyEngine`] ties the pieces together: it validates the incoming
//! sample for the selected method, rebuilds profiles from the full history
//! (no caching between requests), delegates scoring to the method module,
//! and returns the ranked verdict.
//!
//! The trained model is the only shared mutable state. Lazy training runs
//! behind a mutex so concurrent first requests cannot race a torn artifact
//! onto disk; the slot also caches the loaded model across requests until
//! [`IdentifyEngine::retrain`] replaces it.

use crate::classifier::TrainedModel;
use crate::config::IdentifyConfig;
use crate::decision::{self, Analysis, MatchResult, Verdict};
use crate::error::{IdentifyError, Result};
use crate::features;
use crate::profile::{self, HistoryStore, JsonHistoryStore};
use crate::sample::TypingSample;
use std::str::FromStr;
use std::sync::Mutex;

/// Minimum sequence lengths for the statistical method.
const MIN_HOLD_TIMES: usize = 5;
const MIN_FLIGHT_TIMES: usize = 4;
const MIN_DOWN_DOWN_TIMES: usize = 4;

/// Identification method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Statistical,
    Ngram,
    Ml,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Statistical => "statistical",
            Method::Ngram => "ngram",
            Method::Ml => "ml",
        }
    }
}

impl FromStr for Method {
    type Err = IdentifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "statistical" => Ok(Method::Statistical),
            "ngram" => Ok(Method::Ngram),
            "ml" => Ok(Method::Ml),
            other => Err(IdentifyError::UnknownMethod(other.to_string())),
        }
    }
}

/// Identification engine over an injected history store.
pub struct IdentifyEngine {
    config: IdentifyConfig,
    store: Box<dyn HistoryStore>,
    model: Mutex<Option<TrainedModel>>,
}

impl IdentifyEngine {
    /// Engine over the JSON history directory named in the configuration.
    pub fn new(config: IdentifyConfig) -> Self {
        let store = JsonHistoryStore::new(config.data_dir.clone());
        Self::with_store(config, Box::new(store))
    }

    /// Engine over a caller-supplied history collaborator.
    pub fn with_store(config: IdentifyConfig, store: Box<dyn HistoryStore>) -> Self {
        Self {
            config,
            store,
            model: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &IdentifyConfig {
        &self.config
    }

    /// Identify the user who most plausibly produced the sample, using the
    /// method named by the request selector.
    pub fn identify(&self, method: &str, sample: &TypingSample) -> Result<Verdict> {
        let method = Method::from_str(method)?;
        let verdict = match method {
            Method::Statistical => self.identify_statistical(sample)?,
            Method::Ngram => self.identify_ngram(sample)?,
            Method::Ml => self.identify_ml(sample)?,
        };
        log::info!(
            "{}: verdict {} (acceptance {:.3})",
            method.as_str(),
            verdict.user,
            verdict.acceptance
        );
        Ok(verdict)
    }

    fn identify_statistical(&self, sample: &TypingSample) -> Result<Verdict> {
        if sample.hold_times.len() < MIN_HOLD_TIMES
            || sample.flight_times.len() < MIN_FLIGHT_TIMES
            || sample.down_down_times.len() < MIN_DOWN_DOWN_TIMES
        {
            return Err(IdentifyError::InsufficientData(format!(
                "need at least {MIN_HOLD_TIMES} hold, {MIN_FLIGHT_TIMES} flight and \
                 {MIN_DOWN_DOWN_TIMES} down-down times; got {}/{}/{}",
                sample.hold_times.len(),
                sample.flight_times.len(),
                sample.down_down_times.len()
            )));
        }

        // Lengths were just validated, so the vector is always derivable.
        let Some(sample_vec) = features::summary_vector(sample) else {
            return Err(IdentifyError::InsufficientData(
                "empty timing sequences".to_string(),
            ));
        };

        let history = self.store.load_history()?;
        let profiles = profile::build_statistical_profiles(&history);
        if profiles.is_empty() {
            return Ok(Verdict::no_profiles(Method::Statistical.as_str()));
        }

        Ok(crate::statistical::identify(
            &sample_vec,
            &profiles,
            &self.config,
        ))
    }

    fn identify_ngram(&self, sample: &TypingSample) -> Result<Verdict> {
        let features = features::extract_ngram_features(sample);
        if features.is_empty() {
            return Err(IdentifyError::NoNgramFeatures);
        }

        let history = self.store.load_history()?;
        let profiles = profile::build_ngram_profiles(&history);
        if profiles.is_empty() {
            return Ok(Verdict::no_profiles(Method::Ngram.as_str()));
        }

        Ok(crate::ngram::identify(&features, &profiles, &self.config))
    }

    fn identify_ml(&self, sample: &TypingSample) -> Result<Verdict> {
        let features = features::extract_ngram_features(sample);
        if features.is_empty() {
            return Err(IdentifyError::NoNgramFeatures);
        }

        let mut slot = self.model.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = TrainedModel::load_if_present(&self.config.model_path);
        }

        let prediction = match slot.as_ref() {
            Some(model) => model.predict(&features),
            None => {
                // Lazy training on first request; the mutex is held for the
                // whole train-and-persist step.
                let model = self.train_model()?;
                let prediction = model.predict(&features);
                *slot = Some(model);
                prediction
            }
        };

        let matches = prediction
            .class_probabilities
            .iter()
            .map(|(user, prob)| MatchResult {
                user: user.clone(),
                acceptance: *prob,
                method: format!("Ensemble class probability: {:.1}%", prob * 100.0),
            })
            .collect();

        Ok(Verdict {
            user: decision::apply_threshold(
                &prediction.user,
                prediction.confidence,
                self.config.ml_threshold,
            ),
            acceptance: prediction.confidence,
            analysis: Analysis::empty(),
            all_matches: decision::rank_matches(matches, self.config.shortlist_len),
            method: Method::Ml.as_str().to_string(),
        })
    }

    /// Train a fresh ensemble from the current history and persist it,
    /// replacing any existing artifact and cached model.
    pub fn retrain(&self) -> Result<()> {
        let mut slot = self.model.lock().unwrap_or_else(|e| e.into_inner());
        let model = self.train_model()?;
        *slot = Some(model);
        Ok(())
    }

    fn train_model(&self) -> Result<TrainedModel> {
        let history = self.store.load_history()?;
        let profiles = profile::build_ngram_profiles(&history);
        let model = TrainedModel::train(&profiles, &self.config)?;
        model.save(&self.config.model_path)?;
        Ok(model)
    }
}
