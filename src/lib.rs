//! Behavioral-biometric user identification from keystroke typing dynamics.
//!
//! Given a short typing sample (key hold durations, inter-key flight
//! durations, down-down intervals, and optional per-n-gram timings), the
//! engine determines which enrolled user most plausibly produced it, or
//! reports no confident match. Three independent methods are available:
//!
//! - **statistical** — acceptance-interval matching of a 6-d summary vector
//!   against each user's historical mean and deviation
//! - **ngram** — feature-wise relative-difference similarity over shared
//!   digraph/trigraph timing features
//! - **ml** — a trained ensemble of a distance-based neighbor classifier
//!   and a margin-based linear classifier
//!
//! Every method yields a [`Verdict`]: the best user (or the "Unknown User"
//! sentinel), its acceptance score, and a ranked top-5 shortlist.
//!
//! ```rust,ignore
//! use typeprint::{IdentifyConfig, IdentifyEngine};
//!
//! let engine = IdentifyEngine::new(IdentifyConfig::default());
//! let verdict = engine.identify("statistical", &sample)?;
//! println!("{} ({:.0}%)", verdict.user, verdict.acceptance * 100.0);
//! ```

pub mod classifier;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod features;
pub mod ngram;
pub mod profile;
pub mod sample;
pub mod statistical;

pub use crate::classifier::TrainedModel;
pub use crate::config::IdentifyConfig;
pub use crate::decision::{MatchResult, Verdict, NO_PROFILES_FOUND, UNKNOWN_USER};
pub use crate::engine::{IdentifyEngine, Method};
pub use crate::error::IdentifyError;
pub use crate::profile::{HistoryStore, JsonHistoryStore};
pub use crate::sample::{NgramData, TypingSample, UserHistory};
