//! Gradient boosted trees via the `gbdt` crate
//!
//! Binary classification with the `LogLikelyhood` loss, which expects labels
//! of 1.0 (defective) and -1.0 (clean) and predicts the probability of the
//! positive class.
//!
//! Note: the gbdt crate works in `f32` (`ValueType`) while tables hold
//! `f64`. Conversions happen at the crate boundary.

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;

use super::{
    check_shape, check_trainable, Classifier, ClassifierResult, ConstantModel, TrainedModel,
};
use crate::data::Table;

#[inline]
fn row_to_f32(row: Vec<f64>) -> Vec<f32> {
    row.into_iter().map(|v| v as f32).collect()
}

/// Boosted-tree model family.
///
/// The diversity seed passed to [`Classifier::train`] is the number of
/// boosting iterations, so repeated trials vary the ensemble size.
#[derive(Debug, Clone)]
pub struct GbdtClassifier {
    max_depth: u32,
    learning_rate: f64,
    min_leaf_size: usize,
}

impl GbdtClassifier {
    pub fn new(max_depth: u32, learning_rate: f64, min_leaf_size: usize) -> Self {
        Self {
            max_depth,
            learning_rate,
            min_leaf_size,
        }
    }
}

impl Default for GbdtClassifier {
    fn default() -> Self {
        Self::new(6, 0.1, 1)
    }
}

impl Classifier for GbdtClassifier {
    fn name(&self) -> &'static str {
        "gbdt"
    }

    fn train(&self, table: &Table, diversity: u32) -> ClassifierResult<Box<dyn TrainedModel>> {
        check_trainable(table)?;
        if let Some(constant) = ConstantModel::for_single_class(table) {
            return Ok(Box::new(constant));
        }

        let feature_count = table.feature_count();
        let mut cfg = Config::new();
        cfg.set_feature_size(feature_count);
        cfg.set_max_depth(self.max_depth);
        cfg.set_iterations(diversity.max(1) as usize);
        cfg.set_shrinkage(self.learning_rate as f32);
        cfg.set_loss("LogLikelyhood");
        cfg.set_debug(false);
        cfg.set_training_optimization_level(2);
        cfg.set_min_leaf_size(self.min_leaf_size);

        let mut gbdt = GBDT::new(&cfg);

        let mut training_data: DataVec = table
            .rows()
            .into_iter()
            .zip(table.labels())
            .map(|(row, &label)| {
                let target = if label > 0.0 { 1.0 } else { -1.0 };
                Data::new_training_data(row_to_f32(row), 1.0, target, None)
            })
            .collect();

        gbdt.fit(&mut training_data);

        Ok(Box::new(GbdtModel {
            model: gbdt,
            feature_count,
        }))
    }
}

/// A fitted boosted-tree ensemble.
pub struct GbdtModel {
    model: GBDT,
    feature_count: usize,
}

impl TrainedModel for GbdtModel {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict_proba(&self, table: &Table) -> ClassifierResult<Vec<f64>> {
        check_shape(self.feature_count, table)?;
        if table.is_empty() {
            return Ok(Vec::new());
        }

        let data: DataVec = table
            .rows()
            .into_iter()
            .map(|row| Data::new_test_data(row_to_f32(row), None))
            .collect();

        Ok(self
            .model
            .predict(&data)
            .into_iter()
            .map(|p| (p as f64).clamp(0.0, 1.0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierError;
    use crate::data::Column;

    /// Two clusters along both features; rows with index >= n/2 are defective.
    fn clusters(n: usize) -> Table {
        let half = n / 2;
        let x: Vec<f64> = (0..n)
            .map(|i| {
                if i < half {
                    -1.0 - (i as f64 * 0.37).sin().abs()
                } else {
                    1.0 + (i as f64 * 0.53).cos().abs()
                }
            })
            .collect();
        let y: Vec<f64> = (0..n).map(|i| (i as f64 * 0.11).sin()).collect();
        let labels: Vec<f64> = (0..n).map(|i| if i < half { 0.0 } else { 1.0 }).collect();
        Table::new(
            vec![Column::new("x", x), Column::new("y", y)],
            Column::new("bug", labels),
        )
        .unwrap()
    }

    #[test]
    fn test_train_and_predict() {
        let table = clusters(40);
        let model = GbdtClassifier::default().train(&table, 20).unwrap();
        let out = model.infer(&table).unwrap();

        assert_eq!(out.probabilities.len(), 40);
        assert!(out
            .probabilities
            .iter()
            .all(|p| (0.0..=1.0).contains(p)));

        // Separable clusters: defective rows should score higher on average
        let mean = |r: std::ops::Range<usize>| {
            let len = r.len() as f64;
            r.map(|i| out.probabilities[i]).sum::<f64>() / len
        };
        assert!(mean(20..40) > mean(0..20));
    }

    #[test]
    fn test_single_class_training_is_constant() {
        let mut table = clusters(10);
        table = Table::new(
            table.features().to_vec(),
            Column::new("bug", vec![0.0; 10]),
        )
        .unwrap();
        let model = GbdtClassifier::default().train(&table, 5).unwrap();
        let out = model.infer(&table).unwrap();
        assert!(out.probabilities.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_train_validation_errors() {
        let empty = Table::empty("bug");
        assert_eq!(
            GbdtClassifier::default().train(&empty, 5).err(),
            Some(ClassifierError::EmptyTable)
        );

        let no_features = Table::new(vec![], Column::new("bug", vec![1.0, 0.0])).unwrap();
        assert_eq!(
            GbdtClassifier::default().train(&no_features, 5).err(),
            Some(ClassifierError::NoFeatures)
        );
    }

    #[test]
    fn test_predict_empty_table() {
        let model = GbdtClassifier::default().train(&clusters(10), 3).unwrap();
        let empty = Table::new(
            vec![Column::new("x", vec![]), Column::new("y", vec![])],
            Column::new("bug", vec![]),
        )
        .unwrap();
        assert!(model.predict_proba(&empty).unwrap().is_empty());
    }
}
