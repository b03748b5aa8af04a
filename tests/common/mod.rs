//! Shared fixtures: synthetic projects and deterministic test classifiers

#![allow(dead_code)]

use std::path::PathBuf;

use bellwether::classifier::{check_shape, Classifier, ClassifierResult, TrainedModel};
use bellwether::config::{PolicyKind, SearchSettings};
use bellwether::data::{Column, Community, MemoryTableSource, Project, Table};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// How the second feature relates to the label
#[derive(Clone, Copy)]
pub enum Shape {
    /// Label is exactly `f1 > 0`; `f2` is noise
    Clean,
    /// Label is `f1 + noise > 0`; `f2` tracks the label with the given sign
    Spurious(f64),
    /// Label and both features independent
    Noise,
}

pub fn synthetic_table(rows: usize, shape: Shape, seed: u64) -> Table {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut f1 = Vec::with_capacity(rows);
    let mut f2 = Vec::with_capacity(rows);
    let mut label = Vec::with_capacity(rows);

    for _ in 0..rows {
        let x: f64 = rng.random_range(-1.0..1.0);
        let (y, z) = match shape {
            Shape::Clean => (x > 0.0, rng.random_range(-1.0..1.0)),
            Shape::Spurious(sign) => {
                let y = x + rng.random_range(-0.5..0.5) > 0.0;
                let centre = if y { sign } else { -sign };
                (y, centre + rng.random_range(-0.3..0.3))
            }
            Shape::Noise => (rng.random_bool(0.5), rng.random_range(-1.0..1.0)),
        };
        f1.push(x);
        f2.push(z);
        label.push(if y { 1.0 } else { 0.0 });
    }

    Table::new(
        vec![Column::new("f1", f1), Column::new("f2", f2)],
        Column::new("bug", label),
    )
    .unwrap()
}

/// Builds a community backed by an in-memory table source.
pub struct Fixture {
    pub tables: MemoryTableSource,
    pub community: Community,
}

impl Fixture {
    pub fn new(name: &str) -> Self {
        Self {
            tables: MemoryTableSource::new(),
            community: Community::new(name),
        }
    }

    /// Add a project with one release file per table.
    pub fn project(mut self, name: &str, releases: Vec<Table>) -> Self {
        let mut files = Vec::new();
        for (i, table) in releases.into_iter().enumerate() {
            let path = PathBuf::from(format!("mem/{}/{}-{}.csv", self.community.name, name, i));
            self.tables.insert(path.clone(), table);
            files.push(path);
        }
        self.community = self.community.with_project(Project::new(name, files));
        self
    }

    /// A second community whose tables share this fixture's source.
    pub fn community(&mut self, name: &str, projects: Vec<(&str, Table)>) -> Community {
        projects
            .into_iter()
            .fold(Community::new(name), |community, (project, table)| {
                let path = PathBuf::from(format!("mem/{name}/{project}-0.csv"));
                self.tables.insert(path.clone(), table);
                community.with_project(Project::new(project, vec![path]))
            })
    }

    /// Add a project whose file is never registered.
    pub fn broken_project(mut self, name: &str) -> Self {
        let path = PathBuf::from(format!("mem/{}/{}-missing.csv", self.community.name, name));
        self.community = self.community.with_project(Project::new(name, vec![path]));
        self
    }
}

/// One bellwether (A) and two projects that overfit to a spurious feature
/// with opposite signs (B, C).
pub fn three_project_fixture(rows: usize) -> Fixture {
    Fixture::new("synthetic")
        .project("A", vec![synthetic_table(rows, Shape::Clean, 1)])
        .project("B", vec![synthetic_table(rows, Shape::Spurious(1.0), 2)])
        .project("C", vec![synthetic_table(rows, Shape::Spurious(-1.0), 3)])
}

pub fn noise_fixture(projects: usize, rows: usize) -> Fixture {
    (0..projects).fold(Fixture::new("noise"), |fixture, i| {
        fixture.project(
            &format!("p{i}"),
            vec![synthetic_table(rows, Shape::Noise, 100 + i as u64)],
        )
    })
}

pub fn settings(policy: PolicyKind) -> SearchSettings {
    SearchSettings {
        seed: Some(7),
        workers: Some(1),
        ..SearchSettings::for_policy(policy)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let cov: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let vx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    let vy: f64 = y.iter().map(|b| (b - my).powi(2)).sum();
    let r = cov / (vx * vy).sqrt();
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// Decision stump on the single feature most correlated with the label.
pub struct StumpClassifier;

pub struct StumpModel {
    feature: usize,
    sign: f64,
    feature_count: usize,
}

impl Classifier for StumpClassifier {
    fn name(&self) -> &'static str {
        "stump"
    }

    fn train(&self, table: &Table, _diversity: u32) -> ClassifierResult<Box<dyn TrainedModel>> {
        let labels: Vec<f64> = table
            .binary_labels()
            .into_iter()
            .map(f64::from)
            .collect();
        let (feature, r) = table
            .features()
            .iter()
            .map(|c| correlation(&c.values, &labels))
            .enumerate()
            .fold((0, 0.0_f64), |best, (i, r)| {
                if r.abs() > best.1.abs() {
                    (i, r)
                } else {
                    best
                }
            });
        Ok(Box::new(StumpModel {
            feature,
            sign: if r < 0.0 { -1.0 } else { 1.0 },
            feature_count: table.feature_count(),
        }))
    }
}

impl TrainedModel for StumpModel {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict_proba(&self, table: &Table) -> ClassifierResult<Vec<f64>> {
        check_shape(self.feature_count, table)?;
        Ok(table.features()[self.feature]
            .values
            .iter()
            .map(|&v| sigmoid(self.sign * v))
            .collect())
    }
}

/// Reads the target's labels and predicts their opposite, so every pair
/// scores a g of zero.
pub struct InvertingClassifier;

/// Reads the target's labels and predicts them exactly.
pub struct OracleClassifier;

struct LabelModel {
    invert: bool,
}

impl Classifier for InvertingClassifier {
    fn name(&self) -> &'static str {
        "inverting"
    }

    fn train(&self, _table: &Table, _diversity: u32) -> ClassifierResult<Box<dyn TrainedModel>> {
        Ok(Box::new(LabelModel { invert: true }))
    }
}

impl Classifier for OracleClassifier {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn train(&self, _table: &Table, _diversity: u32) -> ClassifierResult<Box<dyn TrainedModel>> {
        Ok(Box::new(LabelModel { invert: false }))
    }
}

impl TrainedModel for LabelModel {
    fn feature_count(&self) -> usize {
        0
    }

    fn predict_proba(&self, table: &Table) -> ClassifierResult<Vec<f64>> {
        Ok(table
            .binary_labels()
            .into_iter()
            .map(|l| if (l == 1) != self.invert { 1.0 } else { 0.0 })
            .collect())
    }
}
