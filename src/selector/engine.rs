//! Elimination search engine
//!
//! One run is a loop of rounds over a shrinking [`CandidateSet`]:
//!
//! 1. every surviving source is evaluated against every other surviving
//!    target, `pair_repeats` times, at the round's sample fraction
//! 2. each source gets a median-of-medians g-score
//! 3. the prune policy removes the weakest sources, or the round stalls and
//!    costs a life
//!
//! A run ends when lives run out, fewer than `min_candidates` remain after a
//! removal, or the round cap is hit. Independent repetitions of the run feed
//! a [`WinTally`].

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::report::{PairSkip, ReportSink, SearchEvent};
use super::schedule::SampleSchedule;
use super::tally::WinTally;
use super::{SearchError, SearchResult};
use crate::classifier::Classifier;
use crate::config::{PolicyKind, SearchSettings};
use crate::data::{Community, DataSampler, DatasetProvider, Project, TableSource};
use crate::metrics::{MetricsEngine, Scale};
use crate::normalize::normalize_to_target;

/// Aggregate score of one candidate for one round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub dataset: String,
    /// Median over targets of the per-target median g-score; `None` when no
    /// target could be scored
    #[serde(rename = "median_g_score")]
    pub score: Option<f64>,
}

/// Counters accumulated while searching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Rows drawn by the sampler, training and test sides combined
    pub rows_consumed: u64,
    pub pairs_evaluated: usize,
    pub pairs_skipped: usize,
    /// Evaluations whose metrics fell back to degenerate values
    pub degenerate_pairs: usize,
    pub rounds: usize,
}

impl RunStats {
    pub fn absorb(&mut self, other: &RunStats) {
        self.rows_consumed += other.rows_consumed;
        self.pairs_evaluated += other.pairs_evaluated;
        self.pairs_skipped += other.pairs_skipped;
        self.degenerate_pairs += other.degenerate_pairs;
        self.rounds += other.rounds;
    }
}

/// Final state of one elimination run
#[derive(Debug, Clone, Serialize)]
pub struct RepetitionResult {
    pub repetition: usize,
    pub rounds: usize,
    pub survivors: Vec<String>,
    /// Last round's scores for the survivors, worst first
    pub scores: Vec<ScoreRecord>,
    pub stats: RunStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub policy: PolicyKind,
    pub tally: WinTally,
    /// Candidates with the most wins
    pub bellwethers: Vec<String>,
    pub repetitions: Vec<RepetitionResult>,
    pub stats: RunStats,
}

/// Result of a single-pass, no-elimination ranking
#[derive(Debug, Clone, Serialize)]
pub struct RankOutcome {
    /// Best first; unscored candidates last
    pub scores: Vec<ScoreRecord>,
    pub best: Vec<String>,
    pub stats: RunStats,
}

/// Run-scoped working set of candidate projects, keyed by name within one
/// community.
#[derive(Debug, Clone)]
pub struct CandidateSet<'p> {
    projects: BTreeMap<String, &'p Project>,
}

impl<'p> CandidateSet<'p> {
    pub fn from_community(community: &'p Community) -> Self {
        Self {
            projects: community
                .projects()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.projects.remove(name).is_some()
    }

    fn iter(&self) -> impl Iterator<Item = &'p Project> + '_ {
        self.projects.values().copied()
    }
}

/// Median with the two middle values averaged for even lengths.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Sort ascending by score, unscored first. Ties keep input order.
fn rank_ascending(mut records: Vec<ScoreRecord>) -> Vec<ScoreRecord> {
    records.sort_by(|a, b| match (a.score, b.score) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    });
    records
}

/// Projects play both roles only when sources and targets are one community.
fn is_self_comparison(sources: &Community, targets: &Community) -> bool {
    sources.name == targets.name
}

/// One trial of a (source, target) pair
struct Job<'p> {
    source: &'p Project,
    target: &'p Project,
    seed: u64,
}

enum Trial {
    Scored { g: f64, degenerate: bool },
    Skipped(PairSkip),
}

struct TrialReport {
    trial: Trial,
    rows: usize,
}

/// Bellwether search over a community.
pub struct Selector<'a> {
    sampler: DataSampler<'a>,
    classifier: &'a dyn Classifier,
    settings: SearchSettings,
    metrics: MetricsEngine,
    pool: rayon::ThreadPool,
}

impl<'a> Selector<'a> {
    pub fn new(
        tables: &'a dyn TableSource,
        classifier: &'a dyn Classifier,
        settings: SearchSettings,
    ) -> SearchResult<Self> {
        settings.validate().map_err(SearchError::InvalidConfig)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.workers())
            .build()?;
        Ok(Self {
            sampler: DataSampler::new(tables),
            classifier,
            settings,
            metrics: MetricsEngine::new(Scale::Percent),
            pool,
        })
    }

    /// Self-comparison search: every project of `community` is both a
    /// candidate source and a target.
    pub fn find_bellwether<R: Rng + ?Sized>(
        &self,
        community: &Community,
        rng: &mut R,
        sink: &mut dyn ReportSink,
    ) -> SearchResult<SearchOutcome> {
        self.search(community, community, rng, sink)
    }

    /// Resolve `name` through `provider`, then search it against itself.
    pub fn find_bellwether_named<R: Rng + ?Sized>(
        &self,
        provider: &dyn DatasetProvider,
        name: &str,
        rng: &mut R,
        sink: &mut dyn ReportSink,
    ) -> SearchResult<SearchOutcome> {
        let community = provider
            .community(name)
            .map_err(|source| SearchError::Community {
                name: name.to_string(),
                source,
            })?;
        self.find_bellwether(&community, rng, sink)
    }

    /// Elimination search with candidate sources from `sources` evaluated
    /// against `targets`.
    pub fn search<R: Rng + ?Sized>(
        &self,
        sources: &Community,
        targets: &Community,
        rng: &mut R,
        sink: &mut dyn ReportSink,
    ) -> SearchResult<SearchOutcome> {
        ensure_pairs(sources, targets)?;

        info!(
            "Searching {} candidates against {} targets ({:?} policy, {} repetitions, {} workers)",
            sources.len(),
            targets.len(),
            self.settings.policy,
            self.settings.repetitions(),
            self.settings.workers()
        );

        let mut tally = WinTally::new(sources.names());
        let mut repetitions = Vec::with_capacity(self.settings.repetitions());
        let mut stats = RunStats::default();

        for repetition in 0..self.settings.repetitions() {
            let result = self.run(repetition, sources, targets, rng, sink)?;
            tally.record(result.survivors.iter().map(String::as_str));
            stats.absorb(&result.stats);
            repetitions.push(result);
        }

        sink.emit(SearchEvent::SearchFinished {
            tally: tally.clone(),
        });

        Ok(SearchOutcome {
            policy: self.settings.policy,
            bellwethers: tally.winners(),
            tally,
            repetitions,
            stats,
        })
    }

    /// One elimination run from the full candidate registry.
    pub fn run<R: Rng + ?Sized>(
        &self,
        repetition: usize,
        sources: &Community,
        targets: &Community,
        rng: &mut R,
        sink: &mut dyn ReportSink,
    ) -> SearchResult<RepetitionResult> {
        let mut candidates = CandidateSet::from_community(sources);
        let mut target_set = CandidateSet::from_community(targets);
        let mut schedule =
            SampleSchedule::new(self.settings.initial_fraction, self.settings.fraction_step);
        let shared = is_self_comparison(sources, targets);
        let policy = self.settings.prune_policy();
        let pair_repeats = self.settings.pair_repeats();
        let mut lives = self.settings.lives();
        let mut stats = RunStats::default();
        let mut last_scores = Vec::new();
        let mut round = 0;

        sink.emit(SearchEvent::RepetitionStarted {
            repetition,
            candidates: candidates.len(),
        });

        while lives > 0 {
            if round == self.settings.max_rounds {
                warn!(
                    "Round cap of {} reached with {} candidates left",
                    self.settings.max_rounds,
                    candidates.len()
                );
                break;
            }
            round += 1;

            sink.emit(SearchEvent::RoundStarted {
                repetition,
                round,
                fraction: schedule.current(),
                candidates: candidates.len(),
            });

            let records = self.evaluate_round(
                round,
                &candidates,
                &target_set,
                shared,
                schedule.current(),
                pair_repeats,
                rng,
                sink,
                &mut stats,
            )?;
            let ranked = rank_ascending(records);
            let removed = policy.select(&ranked);

            if removed.is_empty() {
                lives -= 1;
                sink.emit(SearchEvent::Stalled { round, lives });
            } else {
                for name in &removed {
                    candidates.remove(name);
                    if shared {
                        target_set.remove(name);
                    }
                }
                sink.emit(SearchEvent::Removed {
                    round,
                    removed: ranked
                        .iter()
                        .filter(|r| removed.contains(&r.dataset))
                        .cloned()
                        .collect(),
                    remaining: candidates.len(),
                });
                if candidates.len() < self.settings.min_candidates {
                    lives = 0;
                }
            }

            last_scores = ranked;
            schedule.advance();
        }

        stats.rounds = round;
        let survivors = candidates.names();
        let scores: Vec<ScoreRecord> = last_scores
            .into_iter()
            .filter(|r| candidates.contains(&r.dataset))
            .collect();

        sink.emit(SearchEvent::RepetitionFinished {
            repetition,
            rounds: round,
            survivors: survivors.clone(),
            scores: scores.clone(),
        });

        Ok(RepetitionResult {
            repetition,
            rounds: round,
            survivors,
            scores,
            stats,
        })
    }

    /// Single pass over all pairs on full tables, without elimination.
    pub fn rank<R: Rng + ?Sized>(
        &self,
        sources: &Community,
        targets: &Community,
        rng: &mut R,
        sink: &mut dyn ReportSink,
    ) -> SearchResult<RankOutcome> {
        ensure_pairs(sources, targets)?;
        let candidates = CandidateSet::from_community(sources);
        let target_set = CandidateSet::from_community(targets);
        let fraction = SampleSchedule::full().current();
        let mut stats = RunStats::default();

        sink.emit(SearchEvent::RoundStarted {
            repetition: 0,
            round: 1,
            fraction,
            candidates: candidates.len(),
        });
        let records = self.evaluate_round(
            1,
            &candidates,
            &target_set,
            is_self_comparison(sources, targets),
            fraction,
            self.settings.rank_pair_repeats(),
            rng,
            sink,
            &mut stats,
        )?;
        stats.rounds = 1;

        let mut scored = records;
        scored.sort_by(|a, b| match (a.score, b.score) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some(_), None) => std::cmp::Ordering::Less,
            (Some(x), Some(y)) => y.total_cmp(&x),
        });

        let top = scored.first().and_then(|r| r.score);
        let best = scored
            .iter()
            .filter(|r| top.is_some() && r.score == top)
            .map(|r| r.dataset.clone())
            .collect();

        Ok(RankOutcome {
            scores: scored,
            best,
            stats,
        })
    }

    /// Score every surviving source for one round, in candidate name order.
    /// With `shared` set, a source is never scored against itself.
    #[allow(clippy::too_many_arguments)]
    fn evaluate_round<R: Rng + ?Sized>(
        &self,
        round: usize,
        candidates: &CandidateSet<'_>,
        targets: &CandidateSet<'_>,
        shared: bool,
        fraction: f64,
        pair_repeats: usize,
        rng: &mut R,
        sink: &mut dyn ReportSink,
        stats: &mut RunStats,
    ) -> SearchResult<Vec<ScoreRecord>> {
        // Seeds are drawn up front so results do not depend on scheduling
        let mut jobs = Vec::new();
        for source in candidates.iter() {
            for target in targets.iter().filter(|t| !shared || t.name != source.name) {
                for _ in 0..pair_repeats {
                    jobs.push(Job {
                        source,
                        target,
                        seed: rng.random(),
                    });
                }
            }
        }

        let reports: Vec<SearchResult<TrialReport>> = self.pool.install(|| {
            jobs.par_iter()
                .map(|job| self.evaluate_pair(job, fraction))
                .collect()
        });

        let mut per_pair: BTreeMap<&str, BTreeMap<&str, Vec<f64>>> = candidates
            .iter()
            .map(|p| (p.name.as_str(), BTreeMap::new()))
            .collect();

        for (job, report) in jobs.iter().zip(reports) {
            let report = report?;
            stats.rows_consumed += report.rows as u64;
            match report.trial {
                Trial::Scored { g, degenerate } => {
                    stats.pairs_evaluated += 1;
                    if degenerate {
                        stats.degenerate_pairs += 1;
                    }
                    per_pair
                        .entry(job.source.name.as_str())
                        .or_default()
                        .entry(job.target.name.as_str())
                        .or_default()
                        .push(g);
                }
                Trial::Skipped(reason) => {
                    stats.pairs_skipped += 1;
                    sink.emit(SearchEvent::PairSkipped {
                        round,
                        source: job.source.name.clone(),
                        target: job.target.name.clone(),
                        reason,
                    });
                }
            }
        }

        let mut records = Vec::with_capacity(per_pair.len());
        for (source, by_target) in per_pair {
            let mut target_medians: Vec<f64> = by_target
                .into_values()
                .filter_map(|mut g| median(&mut g))
                .collect();
            let score = median(&mut target_medians);
            if score.is_none() {
                sink.emit(SearchEvent::SourceUnscored {
                    round,
                    source: source.to_string(),
                });
            }
            records.push(ScoreRecord {
                dataset: source.to_string(),
                score,
            });
        }
        Ok(records)
    }

    /// Sample, normalize, train, infer and score one trial.
    fn evaluate_pair(&self, job: &Job<'_>, fraction: f64) -> SearchResult<TrialReport> {
        let mut rng = ChaCha8Rng::seed_from_u64(job.seed);

        let training = self
            .sampler
            .sample(job.source, fraction, &mut rng)
            .map_err(|e| SearchError::data(&job.source.name, e))?;
        let test = self
            .sampler
            .sample(job.target, fraction, &mut rng)
            .map_err(|e| SearchError::data(&job.target.name, e))?;
        let rows = training.rows_drawn + test.rows_drawn;

        if training.table.is_empty() || test.table.is_empty() {
            return Ok(TrialReport {
                trial: Trial::Skipped(PairSkip::EmptySample),
                rows,
            });
        }

        let pair = normalize_to_target(&training.table, &test.table);
        if pair.is_empty() {
            return Ok(TrialReport {
                trial: Trial::Skipped(PairSkip::EmptyFeatureIntersection),
                rows,
            });
        }

        let diversity =
            rng.random_range(self.settings.diversity_min..=self.settings.diversity_max);
        let inference = self
            .classifier
            .train(&pair.training, diversity)
            .and_then(|model| model.infer(&pair.test))
            .map_err(|e| SearchError::classifier(&job.source.name, &job.target.name, e))?;

        let assessment = self.metrics.evaluate(
            pair.test.labels(),
            &inference.predicted,
            &inference.probabilities,
            &mut rng,
        );

        Ok(TrialReport {
            trial: Trial::Scored {
                g: assessment.scores.g,
                degenerate: assessment.is_degenerate(),
            },
            rows,
        })
    }
}

fn ensure_pairs(sources: &Community, targets: &Community) -> SearchResult<()> {
    let has_pair = if is_self_comparison(sources, targets) {
        sources.names().any(|s| targets.names().any(|t| t != s))
    } else {
        !sources.is_empty() && !targets.is_empty()
    };
    if has_pair {
        Ok(())
    } else {
        Err(SearchError::TooFewCandidates {
            found: sources.len(),
        })
    }
}
