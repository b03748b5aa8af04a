//! Search progress reporting
//!
//! The engine emits [`SearchEvent`]s to a [`ReportSink`] supplied by the
//! caller. Sinks may log, collect, render or discard them.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{ScoreRecord, WinTally};

/// Why a (source, target) trial contributed no score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairSkip {
    /// A sampled table had no rows
    EmptySample,
    /// Normalization left no shared usable feature column
    EmptyFeatureIntersection,
}

impl std::fmt::Display for PairSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairSkip::EmptySample => write!(f, "empty sample"),
            PairSkip::EmptyFeatureIntersection => write!(f, "no shared usable features"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SearchEvent {
    RepetitionStarted {
        repetition: usize,
        candidates: usize,
    },
    RoundStarted {
        repetition: usize,
        round: usize,
        fraction: f64,
        candidates: usize,
    },
    PairSkipped {
        round: usize,
        source: String,
        target: String,
        reason: PairSkip,
    },
    /// Every target was skipped for this source; it ranks as worst.
    SourceUnscored { round: usize, source: String },
    Removed {
        round: usize,
        removed: Vec<ScoreRecord>,
        remaining: usize,
    },
    Stalled { round: usize, lives: u32 },
    RepetitionFinished {
        repetition: usize,
        rounds: usize,
        survivors: Vec<String>,
        scores: Vec<ScoreRecord>,
    },
    SearchFinished { tally: WinTally },
}

/// Receives search events.
pub trait ReportSink {
    fn emit(&mut self, event: SearchEvent);
}

/// Discards everything.
impl ReportSink for () {
    fn emit(&mut self, _event: SearchEvent) {}
}

/// Forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), |s| format!("{:.2}", s))
}

impl ReportSink for TracingSink {
    fn emit(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::RepetitionStarted {
                repetition,
                candidates,
            } => info!("Repetition {} with {} candidates", repetition + 1, candidates),
            SearchEvent::RoundStarted {
                round,
                fraction,
                candidates,
                ..
            } => debug!(
                "Round {}: {} candidates at sample fraction {:.2}",
                round, candidates, fraction
            ),
            SearchEvent::PairSkipped {
                source,
                target,
                reason,
                ..
            } => debug!("Skipped {} -> {}: {}", source, target, reason),
            SearchEvent::SourceUnscored { round, source } => {
                warn!("Round {}: no target could be scored for {}", round, source)
            }
            SearchEvent::Removed {
                round,
                removed,
                remaining,
            } => {
                let names: Vec<String> = removed
                    .iter()
                    .map(|r| format!("{} ({})", r.dataset, format_score(r.score)))
                    .collect();
                info!(
                    "Round {}: removed {}; {} remain",
                    round,
                    names.join(", "),
                    remaining
                );
            }
            SearchEvent::Stalled { round, lives } => {
                info!("Round {}: nothing removed, {} lives left", round, lives)
            }
            SearchEvent::RepetitionFinished {
                repetition,
                rounds,
                survivors,
                ..
            } => info!(
                "Repetition {} finished after {} rounds: {}",
                repetition + 1,
                rounds,
                survivors.join(", ")
            ),
            SearchEvent::SearchFinished { tally } => {
                let wins: Vec<String> = tally
                    .ranked()
                    .into_iter()
                    .map(|(name, n)| format!("{}={}", name, n))
                    .collect();
                info!("Win tally: {}", wins.join(", "));
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub events: Vec<SearchEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removal events, in order.
    pub fn removals(&self) -> impl Iterator<Item = &Vec<ScoreRecord>> {
        self.events.iter().filter_map(|e| match e {
            SearchEvent::Removed { removed, .. } => Some(removed),
            _ => None,
        })
    }

    pub fn stalls(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SearchEvent::Stalled { .. }))
            .count()
    }
}

impl ReportSink for CollectingSink {
    fn emit(&mut self, event: SearchEvent) {
        self.events.push(event);
    }
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn emit(&mut self, event: SearchEvent) {
        (**self).emit(event);
    }
}
