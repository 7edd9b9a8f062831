//! Column-wise feature standardization.
//!
//! Parameters are derived from training data only. Columns with zero spread
//! use a unit deviation so they standardize to zero instead of dividing by
//! zero, and absent values standardize to zero (the column mean).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
}

impl StandardScaler {
    /// Fit per-column mean and population standard deviation over the values
    /// present in each column.
    pub fn fit(rows: &[Vec<Option<f64>>], columns: usize) -> Self {
        let mut means = vec![0.0; columns];
        let mut std_devs = vec![1.0; columns];

        for col in 0..columns {
            let values: Vec<f64> = rows.iter().filter_map(|row| row[col]).collect();
            if values.is_empty() {
                continue;
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            let std = var.sqrt();

            means[col] = mean;
            std_devs[col] = if std > 0.0 { std } else { 1.0 };
        }

        Self { means, std_devs }
    }

    /// Standardize one projected row. Missing values map to 0.
    pub fn transform(&self, row: &[Option<f64>]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(col, value)| match value {
                Some(v) => (v - self.means[col]) / self.std_devs[col],
                None => 0.0,
            })
            .collect()
    }
}
