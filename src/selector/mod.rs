//! Bellwether selection by iterative elimination
//!
//! [`Selector`] drives sampling, normalization, classification and scoring
//! for every (source, target) pair, then prunes candidates with a
//! [`PrunePolicy`] until a small stable set remains.

mod engine;
mod policy;
mod report;
mod schedule;
mod tally;

pub use engine::{
    median, CandidateSet, RankOutcome, RepetitionResult, RunStats, ScoreRecord, SearchOutcome,
    Selector,
};
pub use policy::PrunePolicy;
pub use report::{CollectingSink, PairSkip, ReportSink, SearchEvent, TracingSink};
pub use schedule::SampleSchedule;
pub use tally::WinTally;

use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::data::DataError;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("cannot resolve community '{name}': {source}")]
    Community {
        name: String,
        #[source]
        source: DataError,
    },

    #[error("data unavailable for project '{project}': {source}")]
    Data {
        project: String,
        #[source]
        source: DataError,
    },

    #[error("classifier failed training on '{source_project}' for target '{target_project}': {error}")]
    Classifier {
        source_project: String,
        target_project: String,
        #[source]
        error: ClassifierError,
    },

    #[error("need at least two distinct projects to compare, found {found}")]
    TooFewCandidates { found: usize },

    #[error("invalid search settings: {0}")]
    InvalidConfig(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl SearchError {
    pub fn data(project: &str, source: DataError) -> Self {
        Self::Data {
            project: project.to_string(),
            source,
        }
    }

    pub fn classifier(source: &str, target: &str, error: ClassifierError) -> Self {
        Self::Classifier {
            source_project: source.to_string(),
            target_project: target.to_string(),
            error,
        }
    }

    /// Project whose data caused the failure, if any
    pub fn project(&self) -> Option<&str> {
        match self {
            Self::Data { project, .. } => Some(project),
            Self::Classifier { source_project, .. } => Some(source_project),
            _ => None,
        }
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
