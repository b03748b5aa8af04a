//! Small feed-forward network classifier
//!
//! 2-layer MLP implemented in pure Rust:
//! Input → Linear(hidden) → ReLU → Linear(2) → Softmax
//!
//! Trained with per-row SGD on cross-entropy. The diversity seed drives both
//! weight initialisation and the row order of every epoch, so each trial of
//! a pair fits a different network.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{
    check_shape, check_trainable, Classifier, ClassifierResult, ConstantModel, TrainedModel,
};
use crate::data::Table;

#[derive(Debug, Clone)]
pub struct MlpClassifier {
    hidden_size: usize,
    epochs: usize,
    learning_rate: f64,
}

impl MlpClassifier {
    pub fn new(hidden_size: usize, epochs: usize, learning_rate: f64) -> Self {
        Self {
            hidden_size: hidden_size.max(1),
            epochs: epochs.max(1),
            learning_rate,
        }
    }
}

impl Default for MlpClassifier {
    fn default() -> Self {
        Self::new(16, 30, 0.05)
    }
}

impl Classifier for MlpClassifier {
    fn name(&self) -> &'static str {
        "mlp"
    }

    fn train(&self, table: &Table, diversity: u32) -> ClassifierResult<Box<dyn TrainedModel>> {
        check_trainable(table)?;
        if let Some(constant) = ConstantModel::for_single_class(table) {
            return Ok(Box::new(constant));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(diversity as u64);
        let mut model = MlpModel::new(table.feature_count(), self.hidden_size, &mut rng);

        let rows = table.rows();
        let labels: Vec<bool> = table.labels().iter().map(|&l| l > 0.0).collect();
        let mut order: Vec<usize> = (0..rows.len()).collect();

        for _ in 0..self.epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                model.train_step(&rows[i], labels[i], self.learning_rate);
            }
        }

        Ok(Box::new(model))
    }
}

/// Fitted network weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpModel {
    /// First layer weights [hidden_size x input_size]
    w1: Vec<Vec<f64>>,
    /// First layer bias [hidden_size]
    b1: Vec<f64>,
    /// Second layer weights [2 x hidden_size]
    w2: Vec<Vec<f64>>,
    /// Second layer bias [2]
    b2: Vec<f64>,
    input_size: usize,
    hidden_size: usize,
}

impl MlpModel {
    /// Random weights, He-scaled.
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let scale1 = (2.0 / input_size.max(1) as f64).sqrt();
        let scale2 = (2.0 / hidden_size.max(1) as f64).sqrt();

        let w1 = (0..hidden_size)
            .map(|_| {
                (0..input_size)
                    .map(|_| rng.random_range(-scale1..scale1))
                    .collect()
            })
            .collect();
        let w2 = (0..2)
            .map(|_| {
                (0..hidden_size)
                    .map(|_| rng.random_range(-scale2..scale2))
                    .collect()
            })
            .collect();

        Self {
            w1,
            b1: vec![0.0; hidden_size],
            w2,
            b2: vec![0.0; 2],
            input_size,
            hidden_size,
        }
    }

    fn hidden(&self, x: &[f64]) -> Vec<f64> {
        self.w1
            .iter()
            .zip(&self.b1)
            .map(|(w, b)| {
                let sum = b + w.iter().zip(x).map(|(w, x)| w * x).sum::<f64>();
                sum.max(0.0) // ReLU
            })
            .collect()
    }

    fn softmax(&self, hidden: &[f64]) -> [f64; 2] {
        let mut logits = [0.0f64; 2];
        for (i, logit) in logits.iter_mut().enumerate() {
            *logit = self.b2[i]
                + self.w2[i]
                    .iter()
                    .zip(hidden)
                    .map(|(w, h)| w * h)
                    .sum::<f64>();
        }
        let max_logit = logits[0].max(logits[1]);
        let exp0 = (logits[0] - max_logit).exp();
        let exp1 = (logits[1] - max_logit).exp();
        let sum = exp0 + exp1;
        [exp0 / sum, exp1 / sum]
    }

    /// Probability that a single row is defective.
    pub fn probability(&self, x: &[f64]) -> f64 {
        self.softmax(&self.hidden(x))[1]
    }

    /// One SGD update on a single row. Returns the cross-entropy loss.
    pub fn train_step(&mut self, x: &[f64], defective: bool, learning_rate: f64) -> f64 {
        let hidden = self.hidden(x);
        let probs = self.softmax(&hidden);

        let target = usize::from(defective);
        let loss = -probs[target].max(f64::MIN_POSITIVE).ln();

        // Gradient of softmax + cross-entropy
        let mut d_logits = probs;
        d_logits[target] -= 1.0;

        // Hidden gradient uses W2 before it is updated
        let mut d_hidden = vec![0.0f64; self.hidden_size];
        for (j, d) in d_hidden.iter_mut().enumerate() {
            if hidden[j] > 0.0 {
                *d = (0..2).map(|i| d_logits[i] * self.w2[i][j]).sum();
            }
        }

        for i in 0..2 {
            self.b2[i] -= learning_rate * d_logits[i];
            for j in 0..self.hidden_size {
                self.w2[i][j] -= learning_rate * d_logits[i] * hidden[j];
            }
        }

        for i in 0..self.hidden_size {
            self.b1[i] -= learning_rate * d_hidden[i];
            for j in 0..x.len().min(self.input_size) {
                self.w1[i][j] -= learning_rate * d_hidden[i] * x[j];
            }
        }

        loss
    }
}

impl TrainedModel for MlpModel {
    fn feature_count(&self) -> usize {
        self.input_size
    }

    fn predict_proba(&self, table: &Table) -> ClassifierResult<Vec<f64>> {
        check_shape(self.input_size, table)?;
        Ok(table.rows().iter().map(|row| self.probability(row)).collect())
    }
}
