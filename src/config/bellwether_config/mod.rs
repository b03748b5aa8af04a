//! Project-level configuration support
//!
//! Loads `bellwether.toml` (preferred) or `.bellwetherrc.json` from a
//! directory. Every field is optional; missing values fall back to the
//! defaults of the selected elimination policy.
//!
//! Example bellwether.toml:
//! ```toml
//! [search]
//! policy = "threshold"
//! threshold = 55.0
//! repetitions = 10
//! seed = 7
//!
//! [classifier]
//! kind = "gbdt"
//! max_depth = 4
//!
//! [data]
//! root = "/datasets/defects"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::classifier::ClassifierConfig;
use crate::selector::PrunePolicy;

/// Top-level configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BellwetherConfig {
    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub data: DataConfig,
}

/// Where community directories live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_root")]
    pub root: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: default_data_root(),
        }
    }
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

/// Elimination strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Drop the lowest third of candidates each round
    #[default]
    Fractional,
    /// Drop every candidate scoring below a fixed threshold
    Threshold,
}

impl std::str::FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fractional" => Ok(Self::Fractional),
            "threshold" => Ok(Self::Threshold),
            other => Err(format!(
                "unknown policy '{other}' (expected fractional or threshold)"
            )),
        }
    }
}

/// Elimination search tunables (`[search]`)
///
/// `lives`, `pair_repeats` and `repetitions` default differently per policy,
/// so they are stored as overrides and resolved through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub policy: PolicyKind,

    /// Stall budget (fractional 10, threshold 4)
    #[serde(default)]
    pub lives: Option<u32>,

    /// Trials per (source, target) pair per round (fractional 30, threshold 1)
    #[serde(default)]
    pub pair_repeats: Option<usize>,

    /// Independent elimination runs (fractional 1, threshold 30)
    #[serde(default)]
    pub repetitions: Option<usize>,

    /// Minimum aggregate g-score kept by the threshold policy (0-100 scale)
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Fractional policy removes `floor(n / denominator)` candidates
    #[serde(default = "default_fraction_denominator")]
    pub fraction_denominator: usize,

    #[serde(default = "default_initial_fraction")]
    pub initial_fraction: f64,

    #[serde(default = "default_fraction_step")]
    pub fraction_step: f64,

    /// A run stops once fewer candidates than this remain
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,

    /// Hard cap on rounds per run
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Diversity seeds handed to the classifier are drawn from this range
    #[serde(default = "default_diversity_min")]
    pub diversity_min: u32,

    #[serde(default = "default_diversity_max")]
    pub diversity_max: u32,

    /// Fixed RNG seed; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Worker threads for pair evaluation; available parallelism when absent
    #[serde(default)]
    pub workers: Option<usize>,
}

fn default_threshold() -> f64 {
    52.0
}
fn default_fraction_denominator() -> usize {
    3
}
fn default_initial_fraction() -> f64 {
    0.20
}
fn default_fraction_step() -> f64 {
    0.05
}
fn default_min_candidates() -> usize {
    3
}
fn default_max_rounds() -> usize {
    200
}
fn default_diversity_min() -> u32 {
    1
}
fn default_diversity_max() -> u32 {
    100
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::for_policy(PolicyKind::default())
    }
}

impl SearchSettings {
    /// Defaults for the given policy.
    pub fn for_policy(policy: PolicyKind) -> Self {
        Self {
            policy,
            lives: None,
            pair_repeats: None,
            repetitions: None,
            threshold: default_threshold(),
            fraction_denominator: default_fraction_denominator(),
            initial_fraction: default_initial_fraction(),
            fraction_step: default_fraction_step(),
            min_candidates: default_min_candidates(),
            max_rounds: default_max_rounds(),
            diversity_min: default_diversity_min(),
            diversity_max: default_diversity_max(),
            seed: None,
            workers: None,
        }
    }

    pub fn lives(&self) -> u32 {
        self.lives.unwrap_or(match self.policy {
            PolicyKind::Fractional => 10,
            PolicyKind::Threshold => 4,
        })
    }

    pub fn pair_repeats(&self) -> usize {
        self.pair_repeats.unwrap_or(match self.policy {
            PolicyKind::Fractional => 30,
            PolicyKind::Threshold => 1,
        })
    }

    pub fn repetitions(&self) -> usize {
        self.repetitions.unwrap_or(match self.policy {
            PolicyKind::Fractional => 1,
            PolicyKind::Threshold => 30,
        })
    }

    /// Trials per pair for single-pass ranking
    pub fn rank_pair_repeats(&self) -> usize {
        self.pair_repeats.unwrap_or(30)
    }

    pub fn workers(&self) -> usize {
        self.workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .clamp(1, 64)
    }

    pub fn prune_policy(&self) -> PrunePolicy {
        match self.policy {
            PolicyKind::Fractional => PrunePolicy::Fractional {
                denominator: self.fraction_denominator,
            },
            PolicyKind::Threshold => PrunePolicy::Threshold {
                threshold: self.threshold,
                floor: self.min_candidates,
            },
        }
    }

    /// Check that the settings describe a runnable search.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.initial_fraction > 0.0 && self.initial_fraction <= 1.0) {
            return Err(format!(
                "initial_fraction must be in (0, 1], got {}",
                self.initial_fraction
            ));
        }
        if !(self.fraction_step >= 0.0 && self.fraction_step.is_finite()) {
            return Err(format!(
                "fraction_step must be non-negative, got {}",
                self.fraction_step
            ));
        }
        if self.lives() == 0 {
            return Err("lives must be at least 1".to_string());
        }
        if self.pair_repeats() == 0 || self.rank_pair_repeats() == 0 {
            return Err("pair_repeats must be at least 1".to_string());
        }
        if self.repetitions() == 0 {
            return Err("repetitions must be at least 1".to_string());
        }
        if self.fraction_denominator == 0 {
            return Err("fraction_denominator must be at least 1".to_string());
        }
        if self.max_rounds == 0 {
            return Err("max_rounds must be at least 1".to_string());
        }
        if !self.threshold.is_finite() {
            return Err("threshold must be a finite number".to_string());
        }
        if self.diversity_min == 0 || self.diversity_min > self.diversity_max {
            return Err(format!(
                "diversity range {}..={} is empty or starts at zero",
                self.diversity_min, self.diversity_max
            ));
        }
        Ok(())
    }
}

/// Load configuration from a directory.
///
/// Searches for configuration files in this order:
/// 1. bellwether.toml
/// 2. .bellwetherrc.json
///
/// Returns default config if no file is found or parsing fails.
pub fn load_config(dir: &Path) -> BellwetherConfig {
    let toml_path = dir.join("bellwether.toml");
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    let json_path = dir.join(".bellwetherrc.json");
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    debug!("No config file found in {}, using defaults", dir.display());
    BellwetherConfig::default()
}

fn load_toml_config(path: &Path) -> anyhow::Result<BellwetherConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: BellwetherConfig = toml::from_str(&content)?;
    Ok(config)
}

fn load_json_config(path: &Path) -> anyhow::Result<BellwetherConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: BellwetherConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Commented configuration written by `bellwether init`
pub const EXAMPLE_CONFIG: &str = r#"# Bellwether configuration

[search]
# Elimination policy: "fractional" (drop lowest third) or "threshold"
policy = "fractional"

# Stall budget (default: 10 fractional, 4 threshold)
# lives = 10

# Trials per (source, target) pair per round (default: 30 fractional, 1 threshold)
# pair_repeats = 30

# Independent elimination runs (default: 1 fractional, 30 threshold)
# repetitions = 1

# Threshold policy: minimum aggregate g-score to survive (0-100)
threshold = 52.0

# Sample fraction schedule
initial_fraction = 0.20
fraction_step = 0.05

# Stop once fewer candidates than this remain
min_candidates = 3

# Hard cap on rounds per run
max_rounds = 200

# Fix the RNG seed for reproducible runs
# seed = 42

[classifier]
# Model family: "gbdt" or "mlp"
kind = "gbdt"
max_depth = 6
learning_rate = 0.1

[data]
# Directory holding one sub-directory per community
root = "data"
"#;
