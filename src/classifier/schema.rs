//! Versioned feature schema for the classifier ensemble.
//!
//! Training and inference must interpret feature columns identically, so the
//! sorted key list is captured at training time and persisted alongside the
//! model. Inference reindexes a live sample onto the trained schema: keys
//! missing from the sample project to `None` (standardized later to the
//! neutral column value), and keys the schema never saw are ignored.

use crate::features::NgramFeatureMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Current schema layout version.
pub const SCHEMA_VERSION: u32 = 1;

/// Ordered list of feature names defining the model's column space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    /// Feature keys in lexicographic order.
    pub keys: Vec<String>,
}

impl FeatureSchema {
    /// Build the schema from the union of keys across all training maps.
    pub fn from_maps<'a>(maps: impl IntoIterator<Item = &'a NgramFeatureMap>) -> Self {
        let keys: BTreeSet<String> = maps
            .into_iter()
            .flat_map(|map| map.keys().cloned())
            .collect();
        Self {
            version: SCHEMA_VERSION,
            keys: keys.into_iter().collect(),
        }
    }

    /// Number of feature columns.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Reindex a feature map onto this schema's column order.
    pub fn project(&self, map: &NgramFeatureMap) -> Vec<Option<f64>> {
        self.keys.iter().map(|key| map.get(key).copied()).collect()
    }
}
