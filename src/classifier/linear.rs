//! Margin-based linear classifier.
//!
//! One-vs-rest linear separators trained with hinge-loss SGD plus L2
//! regularization. Class probabilities come from a softmax over the margin
//! scores.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

const EPOCHS: usize = 200;
const LEARNING_RATE: f64 = 0.05;
const L2_LAMBDA: f64 = 1e-4;
const SHUFFLE_SEED: u64 = 42;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    /// Per-class weight vectors, `[n_classes][n_features]`.
    weights: Vec<Vec<f64>>,
    /// Per-class bias terms.
    biases: Vec<f64>,
}

impl LinearClassifier {
    /// Train one separator per class against the rest.
    pub fn fit(rows: &[Vec<f64>], labels: &[usize], n_classes: usize) -> Self {
        debug_assert_eq!(rows.len(), labels.len());
        let n_features = rows.first().map_or(0, |r| r.len());

        let mut weights = vec![vec![0.0; n_features]; n_classes];
        let mut biases = vec![0.0; n_classes];

        let mut order: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);

        for _ in 0..EPOCHS {
            order.shuffle(&mut rng);
            for &i in &order {
                let x = &rows[i];
                for class in 0..n_classes {
                    let y = if labels[i] == class { 1.0 } else { -1.0 };
                    let margin = y * (dot(&weights[class], x) + biases[class]);

                    let w = &mut weights[class];
                    if margin < 1.0 {
                        for (wj, xj) in w.iter_mut().zip(x.iter()) {
                            *wj += LEARNING_RATE * (y * xj - L2_LAMBDA * *wj);
                        }
                        biases[class] += LEARNING_RATE * y;
                    } else {
                        for wj in w.iter_mut() {
                            *wj -= LEARNING_RATE * L2_LAMBDA * *wj;
                        }
                    }
                }
            }
        }

        Self { weights, biases }
    }

    /// Softmax over per-class margin scores.
    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let scores: Vec<f64> = self
            .weights
            .iter()
            .zip(self.biases.iter())
            .map(|(w, b)| dot(w, x) + b)
            .collect();

        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        exps.iter().map(|e| e / total).collect()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
