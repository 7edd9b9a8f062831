//! Distance-based neighbor classifier.
//!
//! Euclidean k-nearest-neighbor with inverse-distance-weighted votes: an
//! exact match dominates its neighborhood, so a training point always
//! predicts its own label.

use serde::{Deserialize, Serialize};

/// Keeps a zero distance from collapsing the vote weight to infinity.
const DISTANCE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    pub k: usize,
    points: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl KnnClassifier {
    /// Memorize the training set.
    pub fn fit(k: usize, points: Vec<Vec<f64>>, labels: Vec<usize>) -> Self {
        debug_assert_eq!(points.len(), labels.len());
        Self { k, points, labels }
    }

    /// Class-probability vector from the weighted votes of the k nearest
    /// training points.
    pub fn predict_proba(&self, x: &[f64], n_classes: usize) -> Vec<f64> {
        let mut neighbors: Vec<(f64, usize)> = self
            .points
            .iter()
            .zip(self.labels.iter())
            .map(|(p, &label)| (euclidean(x, p), label))
            .collect();
        neighbors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let k = self.k.min(neighbors.len()).max(1);
        let mut votes = vec![0.0; n_classes];
        for &(dist, label) in neighbors.iter().take(k) {
            votes[label] += 1.0 / (dist + DISTANCE_EPSILON);
        }

        let total: f64 = votes.iter().sum();
        if total > 0.0 {
            for v in &mut votes {
                *v /= total;
            }
        }
        votes
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
