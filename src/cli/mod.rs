//! CLI command definitions and handlers

mod communities;
mod init;
mod progress;
mod search;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use bellwether::classifier::ClassifierKind;
use bellwether::config::{load_config, PolicyKind};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Parse a threshold on the 0-100 g-score scale
fn parse_threshold(s: &str) -> Result<f64, String> {
    let t: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if (0.0..=100.0).contains(&t) {
        Ok(t)
    } else {
        Err("threshold must be between 0 and 100".to_string())
    }
}

/// Bellwether - cross-project defect prediction source selection
#[derive(Parser, Debug)]
#[command(name = "bellwether")]
#[command(
    version,
    about = "Find the bellwether project of a defect-data community",
    long_about = "Bellwether repeatedly trains a defect classifier on each project of a \
community, scores it on every other project, and eliminates the weakest training \
sources until a small stable set remains. The project that survives most often is \
the bellwether: the best single source for cross-project defect prediction.",
    after_help = "\
Examples:
  bellwether communities                      List built-in communities
  bellwether search AEEEM                     Fractional elimination search
  bellwether search Apache --policy threshold Threshold search (30 repetitions)
  bellwether search NASA --seed 7 --format json
  bellwether rank RELINK                      Single pass, no elimination
  bellwether init                             Write an example bellwether.toml"
)]
pub struct Cli {
    /// Directory holding bellwether.toml (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by `search` and `rank`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Community to search (Apache, AEEEM, RELINK, NASA, or a directory name)
    pub community: String,

    /// Evaluate candidates against another community instead of themselves
    #[arg(long)]
    pub against: Option<String>,

    /// Data root holding one directory per community
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Classifier family
    #[arg(long, value_parser = ["gbdt", "mlp"])]
    pub classifier: Option<String>,

    /// Trials per (source, target) pair per round
    #[arg(long)]
    pub pair_repeats: Option<usize>,

    /// Fixed RNG seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format: text, json
    #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

impl RunArgs {
    fn classifier_kind(&self) -> Option<ClassifierKind> {
        self.classifier.as_deref().and_then(|k| k.parse().ok())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example bellwether.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List built-in communities and whether their data is present
    Communities {
        /// Data root holding one directory per community
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Run the elimination search and report the win tally
    #[command(after_help = "\
Examples:
  bellwether search AEEEM                          Defaults: fractional, 1 repetition
  bellwether search AEEEM --repetitions 10         Tally over 10 independent runs
  bellwether search Apache --policy threshold      Threshold 52, 4 lives, 30 repetitions
  bellwether search Apache --against AEEEM         Cross-community comparison
  bellwether search NASA --classifier mlp --seed 1")]
    Search {
        #[command(flatten)]
        args: RunArgs,

        /// Elimination policy: fractional, threshold
        #[arg(long, value_parser = ["fractional", "threshold"])]
        policy: Option<String>,

        /// Independent elimination runs
        #[arg(long)]
        repetitions: Option<usize>,

        /// Stall budget per run
        #[arg(long)]
        lives: Option<u32>,

        /// Threshold policy cut-off on the 0-100 g-score scale
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,
    },

    /// Score every project once on full data, without elimination
    Rank {
        #[command(flatten)]
        args: RunArgs,
    },
}

/// Search-only overrides
#[derive(Debug, Default)]
pub struct SearchFlags {
    pub policy: Option<PolicyKind>,
    pub repetitions: Option<usize>,
    pub lives: Option<u32>,
    pub threshold: Option<f64>,
}

/// Run the CLI command
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config_dir);

    match cli.command {
        Commands::Init { force } => init::run(&cli.config_dir, force),

        Commands::Communities { data } => {
            let root = data.unwrap_or_else(|| config.data.root.clone());
            communities::run(&root)
        }

        Commands::Search {
            args,
            policy,
            repetitions,
            lives,
            threshold,
        } => {
            let flags = SearchFlags {
                policy: policy.as_deref().and_then(|p| p.parse().ok()),
                repetitions,
                lives,
                threshold,
            };
            search::run(config, cli.workers, &args, &flags)
        }

        Commands::Rank { args } => search::rank(config, cli.workers, &args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("4"), Ok(4));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("52"), Ok(52.0));
        assert!(parse_threshold("101").is_err());
    }

    #[test]
    fn test_search_command_parses() {
        let cli = Cli::try_parse_from([
            "bellwether",
            "search",
            "AEEEM",
            "--policy",
            "threshold",
            "--seed",
            "9",
            "--workers",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.workers, Some(2));
        match cli.command {
            Commands::Search { args, policy, .. } => {
                assert_eq!(args.community, "AEEEM");
                assert_eq!(args.seed, Some(9));
                assert_eq!(policy.as_deref(), Some("threshold"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rank_rejects_unknown_classifier() {
        assert!(Cli::try_parse_from(["bellwether", "rank", "NASA", "--classifier", "svm"]).is_err());
    }
}
