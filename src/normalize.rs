//! Cross-project feature normalization
//!
//! A classifier trained on one project is applied to another project with a
//! different metric distribution. Both tables are z-scored with the *target*
//! (test) table's per-column mean and standard deviation, so training sees
//! features on the scale they will have at deployment time.
//!
//! Columns that stop being usable (constant in the target, missing from the
//! target, or producing any non-finite value) are dropped from each table
//! independently; the output keeps only the surviving columns common to both,
//! in the training table's order, with the label column last.

use tracing::debug;

use crate::data::{Column, Table};

/// Result of normalizing a training table against a test table.
#[derive(Debug, Clone)]
pub struct NormalizedPair {
    pub training: Table,
    pub test: Table,
    /// Training columns dropped after standardization
    pub dropped_training: Vec<String>,
    /// Test columns dropped after standardization
    pub dropped_test: Vec<String>,
}

impl NormalizedPair {
    /// No shared usable feature survives, so the pair cannot be classified.
    pub fn is_empty(&self) -> bool {
        self.training.feature_count() == 0
    }
}

/// Mean and sample standard deviation (n - 1 denominator).
///
/// Returns NaN for the statistics that are undefined at the given length.
pub fn column_stats(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n == 1 {
        return (mean, f64::NAN);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, variance.sqrt())
}

fn standardize(values: &[f64], mean: f64, std: f64) -> Option<Vec<f64>> {
    let out: Vec<f64> = values.iter().map(|v| (v - mean) / std).collect();
    out.iter().all(|v| v.is_finite()).then_some(out)
}

/// Standardize `training` and `test` with the test table's feature statistics.
pub fn normalize_to_target(training: &Table, test: &Table) -> NormalizedPair {
    let stats = |name: &str| test.feature(name).map(|c| column_stats(&c.values));

    let mut train_cols = Vec::new();
    let mut dropped_training = Vec::new();
    for col in training.features() {
        match stats(&col.name).and_then(|(m, s)| standardize(&col.values, m, s)) {
            Some(values) => train_cols.push(Column::new(col.name.clone(), values)),
            None => dropped_training.push(col.name.clone()),
        }
    }

    let mut test_cols = Vec::new();
    let mut dropped_test = Vec::new();
    for name in train_cols.iter().map(|c| c.name.as_str()) {
        let Some(col) = test.feature(name) else {
            continue;
        };
        let (mean, std) = column_stats(&col.values);
        match standardize(&col.values, mean, std) {
            Some(values) => test_cols.push(Column::new(name, values)),
            None => dropped_test.push(name.to_string()),
        }
    }

    // Intersection of the survivors, in training order
    let train_cols: Vec<Column> = train_cols
        .into_iter()
        .filter(|c| test_cols.iter().any(|t| t.name == c.name))
        .collect();

    if !dropped_training.is_empty() || !dropped_test.is_empty() {
        debug!(
            "Normalization dropped {} training / {} test columns, {} shared remain",
            dropped_training.len(),
            dropped_test.len(),
            train_cols.len()
        );
    }

    // Lengths are unchanged by standardization, so construction cannot fail
    let training = Table::new(train_cols, training.label().clone())
        .unwrap_or_else(|_| Table::empty(training.label().name.clone()));
    let test = Table::new(test_cols, test.label().clone())
        .unwrap_or_else(|_| Table::empty(test.label().name.clone()));

    NormalizedPair {
        training,
        test,
        dropped_training,
        dropped_test,
    }
}
