//! Pluggable binary defect classifiers
//!
//! The search only needs two capabilities: train on a labelled table, then
//! produce hard labels and positive-class probabilities for another table.
//! Concrete model families implement [`Classifier`] and are interchangeable.
//!
//! Labels are positive when `> 0`. Every `train` call takes a diversity seed
//! drawn by the caller so repeated trials do not all fit the same model.

pub mod gbdt_model;
pub mod mlp;

pub use gbdt_model::{GbdtClassifier, GbdtModel};
pub use mlp::{MlpClassifier, MlpModel};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Table;

/// Errors raised while training or applying a classifier
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("cannot train on an empty table")]
    EmptyTable,

    #[error("table has no feature columns")]
    NoFeatures,

    #[error("model expects {expected} features, table has {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("classifier backend failed: {0}")]
    Backend(String),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Hard predictions and positive-class probabilities, one per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub predicted: Vec<f64>,
    pub probabilities: Vec<f64>,
}

/// A model family that can be fitted on a table.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fit on all feature columns against the label column.
    fn train(&self, table: &Table, diversity: u32) -> ClassifierResult<Box<dyn TrainedModel>>;
}

/// A fitted model.
pub trait TrainedModel {
    fn feature_count(&self) -> usize;

    /// Probability of class 1 for each row.
    fn predict_proba(&self, table: &Table) -> ClassifierResult<Vec<f64>>;

    /// Hard labels (probability >= 0.5) alongside the probabilities.
    fn infer(&self, table: &Table) -> ClassifierResult<Inference> {
        let probabilities = self.predict_proba(table)?;
        let predicted = probabilities
            .iter()
            .map(|&p| if p >= 0.5 { 1.0 } else { 0.0 })
            .collect();
        Ok(Inference {
            predicted,
            probabilities,
        })
    }
}

/// Reject tables no model can be fitted on.
pub(crate) fn check_trainable(table: &Table) -> ClassifierResult<()> {
    if table.is_empty() {
        return Err(ClassifierError::EmptyTable);
    }
    if table.feature_count() == 0 {
        return Err(ClassifierError::NoFeatures);
    }
    Ok(())
}

/// Fail unless `table` has the feature count the model was fitted on.
pub fn check_shape(expected: usize, table: &Table) -> ClassifierResult<()> {
    if table.feature_count() != expected {
        return Err(ClassifierError::ShapeMismatch {
            expected,
            found: table.feature_count(),
        });
    }
    Ok(())
}

/// Predicts one class for every row.
///
/// Used when the training labels contain a single class, where fitting a
/// discriminative model is undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantModel {
    positive: bool,
    feature_count: usize,
}

impl ConstantModel {
    /// A constant model if `table` holds only one class.
    pub fn for_single_class(table: &Table) -> Option<Self> {
        let labels = table.binary_labels();
        let first = *labels.first()?;
        labels.iter().all(|&l| l == first).then_some(Self {
            positive: first == 1,
            feature_count: table.feature_count(),
        })
    }
}

impl TrainedModel for ConstantModel {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict_proba(&self, table: &Table) -> ClassifierResult<Vec<f64>> {
        check_shape(self.feature_count, table)?;
        let p = if self.positive { 1.0 } else { 0.0 };
        Ok(vec![p; table.len()])
    }
}

/// Which model family to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Gradient boosted trees; the diversity seed sets the ensemble size
    #[default]
    Gbdt,
    /// Two-layer network; the diversity seed seeds initialisation
    Mlp,
}

impl std::str::FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gbdt" => Ok(Self::Gbdt),
            "mlp" => Ok(Self::Mlp),
            other => Err(format!("unknown classifier '{other}' (expected gbdt or mlp)")),
        }
    }
}

/// Classifier settings (`[classifier]` in bellwether.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub kind: ClassifierKind,

    /// GBDT maximum tree depth
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// GBDT shrinkage
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// GBDT minimum samples per leaf
    #[serde(default = "default_min_leaf_size")]
    pub min_leaf_size: usize,

    /// MLP hidden layer width
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,

    /// MLP passes over the training rows
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// MLP SGD step size
    #[serde(default = "default_mlp_learning_rate")]
    pub mlp_learning_rate: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::default(),
            max_depth: default_max_depth(),
            learning_rate: default_learning_rate(),
            min_leaf_size: default_min_leaf_size(),
            hidden_size: default_hidden_size(),
            epochs: default_epochs(),
            mlp_learning_rate: default_mlp_learning_rate(),
        }
    }
}

fn default_max_depth() -> u32 {
    6
}
fn default_learning_rate() -> f64 {
    0.1
}
fn default_min_leaf_size() -> usize {
    1
}
fn default_hidden_size() -> usize {
    16
}
fn default_epochs() -> usize {
    30
}
fn default_mlp_learning_rate() -> f64 {
    0.05
}

impl ClassifierConfig {
    /// Instantiate the configured model family.
    pub fn build(&self) -> Box<dyn Classifier> {
        match self.kind {
            ClassifierKind::Gbdt => Box::new(GbdtClassifier::new(
                self.max_depth,
                self.learning_rate,
                self.min_leaf_size,
            )),
            ClassifierKind::Mlp => Box::new(MlpClassifier::new(
                self.hidden_size,
                self.epochs,
                self.mlp_learning_rate,
            )),
        }
    }
}
