//! Search and rank commands

use anyhow::{Context, Result};
use console::style;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

use bellwether::config::{BellwetherConfig, SearchSettings};
use bellwether::data::{Community, CsvTableSource, DatasetProvider, DirectoryProvider};
use bellwether::selector::{RankOutcome, RunStats, ScoreRecord, SearchOutcome, Selector};

use super::progress::ProgressSink;
use super::{RunArgs, SearchFlags};

/// Config values overridden by command-line flags.
fn effective_settings(
    config: &BellwetherConfig,
    workers: Option<usize>,
    args: &RunArgs,
    flags: &SearchFlags,
) -> SearchSettings {
    let mut settings = config.search.clone();
    if let Some(policy) = flags.policy {
        settings.policy = policy;
    }
    if flags.repetitions.is_some() {
        settings.repetitions = flags.repetitions;
    }
    if flags.lives.is_some() {
        settings.lives = flags.lives;
    }
    if let Some(threshold) = flags.threshold {
        settings.threshold = threshold;
    }
    if args.pair_repeats.is_some() {
        settings.pair_repeats = args.pair_repeats;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    if workers.is_some() {
        settings.workers = workers;
    }
    settings
}

/// Resolve the candidate and target communities.
fn load_communities(config: &BellwetherConfig, args: &RunArgs) -> Result<(Community, Community)> {
    let root = args.data.clone().unwrap_or_else(|| config.data.root.clone());
    let provider = DirectoryProvider::new(&root);

    let sources = provider
        .community(&args.community)
        .with_context(|| format!("Failed to load community '{}' from {}", args.community, root.display()))?;
    let targets = match &args.against {
        Some(name) => provider
            .community(name)
            .with_context(|| format!("Failed to load community '{}' from {}", name, root.display()))?,
        None => sources.clone(),
    };
    Ok((sources, targets))
}

/// Seeded generator; draws and reports a seed when none is configured.
fn make_rng(seed: Option<u64>) -> (ChaCha8Rng, u64) {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    (ChaCha8Rng::seed_from_u64(seed), seed)
}

/// Run the elimination search
pub fn run(
    config: BellwetherConfig,
    workers: Option<usize>,
    args: &RunArgs,
    flags: &SearchFlags,
) -> Result<()> {
    let settings = effective_settings(&config, workers, args, flags);
    let mut classifier_config = config.classifier.clone();
    if let Some(kind) = args.classifier_kind() {
        classifier_config.kind = kind;
    }

    let (sources, targets) = load_communities(&config, args)?;
    let tables = CsvTableSource::new();
    let classifier = classifier_config.build();
    let (mut rng, seed) = make_rng(settings.seed);
    let json = args.format == "json";

    if !json {
        println!(
            "\n{} Searching {} ({} projects) with {} · {:?} policy · seed {}\n",
            style("🔔").bold(),
            style(&sources.name).cyan(),
            sources.len(),
            classifier.name(),
            settings.policy,
            seed
        );
    }

    let repetitions = settings.repetitions();
    let selector = Selector::new(&tables, classifier.as_ref(), settings)?;
    let mut sink = ProgressSink::new(repetitions, json);
    let started = Instant::now();
    let outcome = selector.search(&sources, &targets, &mut rng, &mut sink);
    sink.finish();
    let outcome = outcome.context("Bellwether search failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
        print_stats(&outcome.stats, started, tables.cached());
    }
    Ok(())
}

/// Run a single scoring pass on full data
pub fn rank(config: BellwetherConfig, workers: Option<usize>, args: &RunArgs) -> Result<()> {
    let settings = effective_settings(&config, workers, args, &SearchFlags::default());
    let mut classifier_config = config.classifier.clone();
    if let Some(kind) = args.classifier_kind() {
        classifier_config.kind = kind;
    }

    let (sources, targets) = load_communities(&config, args)?;
    let tables = CsvTableSource::new();
    let classifier = classifier_config.build();
    let (mut rng, seed) = make_rng(settings.seed);
    let json = args.format == "json";

    if !json {
        println!(
            "\n{} Ranking {} ({} projects) with {} · seed {}\n",
            style("🔔").bold(),
            style(&sources.name).cyan(),
            sources.len(),
            classifier.name(),
            seed
        );
    }

    let selector = Selector::new(&tables, classifier.as_ref(), settings)?;
    let mut sink = ProgressSink::new(1, json);
    let started = Instant::now();
    let outcome = selector.rank(&sources, &targets, &mut rng, &mut sink);
    sink.finish();
    let outcome = outcome.context("Ranking failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_ranking(&outcome);
        print_stats(&outcome.stats, started, tables.cached());
    }
    Ok(())
}

fn format_score(record: &ScoreRecord) -> String {
    record
        .score
        .map_or_else(|| "n/a".to_string(), |s| format!("{:6.2}", s))
}

fn print_outcome(outcome: &SearchOutcome) {
    println!("{}", style("Win tally").bold());
    let best = outcome.bellwethers.first().and_then(|b| outcome.tally.get(b));
    for (name, wins) in outcome.tally.ranked() {
        let line = format!("  {:<12} {:>3}", name, wins);
        if Some(wins) == best && wins > 0 {
            println!("{} {}", style(line).green(), style("★").yellow());
        } else {
            println!("{}", line);
        }
    }

    if let Some(last) = outcome.repetitions.last() {
        println!(
            "\n{} (last repetition, {} rounds)",
            style("Final scores").bold(),
            last.rounds
        );
        for record in last.scores.iter().rev() {
            println!("  {:<12} {}", record.dataset, format_score(record));
        }
    }

    println!();
    if outcome.bellwethers.is_empty() {
        println!("{} No bellwether found", style("!").yellow());
    } else {
        println!(
            "{} Bellwether: {}",
            style("✓").green(),
            style(outcome.bellwethers.join(", ")).cyan().bold()
        );
    }
}

fn print_ranking(outcome: &RankOutcome) {
    println!("{}", style("Median g-score").bold());
    for record in &outcome.scores {
        let line = format!("  {:<12} {}", record.dataset, format_score(record));
        if outcome.best.contains(&record.dataset) {
            println!("{}", style(line).green());
        } else {
            println!("{}", line);
        }
    }
    if !outcome.best.is_empty() {
        println!(
            "\n{} Best source: {}",
            style("✓").green(),
            style(outcome.best.join(", ")).cyan().bold()
        );
    }
}

fn print_stats(stats: &RunStats, started: Instant, cached_files: usize) {
    println!(
        "{}",
        style(format!(
            "\n{} rounds · {} pairs scored · {} skipped · {} degenerate · {} rows sampled from {} files · {:.1}s",
            stats.rounds,
            stats.pairs_evaluated,
            stats.pairs_skipped,
            stats.degenerate_pairs,
            stats.rows_consumed,
            cached_files,
            started.elapsed().as_secs_f64()
        ))
        .dim()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use bellwether::config::PolicyKind;

    fn args() -> RunArgs {
        RunArgs {
            community: "AEEEM".into(),
            against: None,
            data: None,
            classifier: None,
            pair_repeats: Some(3),
            seed: None,
            format: "text".into(),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = BellwetherConfig::default();
        config.search.seed = Some(1);
        config.search.repetitions = Some(2);

        let flags = SearchFlags {
            policy: Some(PolicyKind::Threshold),
            lives: Some(6),
            ..Default::default()
        };
        let settings = effective_settings(&config, Some(4), &args(), &flags);

        assert_eq!(settings.policy, PolicyKind::Threshold);
        assert_eq!(settings.lives(), 6);
        assert_eq!(settings.repetitions(), 2);
        assert_eq!(settings.pair_repeats(), 3);
        assert_eq!(settings.seed, Some(1));
        assert_eq!(settings.workers(), 4);
    }

    #[test]
    fn test_make_rng_reports_seed() {
        let (_, seed) = make_rng(Some(42));
        assert_eq!(seed, 42);
    }
}
