//! Bellwether - cross-project defect prediction source selection
//!
//! Finds the "bellwether" of a community of software projects: the project
//! whose defect data, used to train a classifier, best predicts defects in
//! the other projects of the same community.
//!
//! The search repeatedly samples every (source, target) pair, normalizes the
//! source to the target's feature distribution, trains on the source, scores
//! the predictions on the target, and eliminates the weakest sources until a
//! small stable set remains.
//!
//! # Example
//!
//! ```rust,ignore
//! use bellwether::classifier::ClassifierConfig;
//! use bellwether::config::SearchSettings;
//! use bellwether::data::{CsvTableSource, DatasetProvider, DirectoryProvider};
//! use bellwether::selector::{Selector, TracingSink};
//!
//! let provider = DirectoryProvider::new("data");
//! let community = provider.community("AEEEM")?;
//! let tables = CsvTableSource::new();
//! let classifier = ClassifierConfig::default().build();
//! let selector = Selector::new(&tables, classifier.as_ref(), SearchSettings::default())?;
//! let outcome = selector.find_bellwether(&community, &mut rand::rng(), &mut TracingSink)?;
//! println!("{:?}", outcome.bellwethers);
//! ```

pub mod classifier;
pub mod config;
pub mod data;
pub mod metrics;
pub mod normalize;
pub mod selector;

pub use selector::{SearchOutcome, Selector, WinTally};
