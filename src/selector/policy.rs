//! Pruning strategies for the elimination search

use super::ScoreRecord;

/// Decides which ranked candidates leave the search after a round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrunePolicy {
    /// Remove the lowest `floor(n / denominator)` candidates.
    Fractional { denominator: usize },
    /// Remove every candidate scoring below `threshold`, but never shrink
    /// the set below `floor` in one round.
    Threshold { threshold: f64, floor: usize },
}

impl PrunePolicy {
    /// Names to remove, given records sorted ascending (worst first).
    ///
    /// Unscored candidates count as worst under both policies. An empty
    /// result means the round stalled.
    pub fn select(&self, ranked: &[ScoreRecord]) -> Vec<String> {
        let n = ranked.len();
        let count = match *self {
            PrunePolicy::Fractional { denominator } => n / denominator.max(1),
            PrunePolicy::Threshold { threshold, floor } => {
                let below = ranked
                    .iter()
                    .filter(|r| r.score.map_or(true, |s| s < threshold))
                    .count();
                below.min(n.saturating_sub(floor))
            }
        };
        ranked
            .iter()
            .take(count)
            .map(|r| r.dataset.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(scores: &[(&str, Option<f64>)]) -> Vec<ScoreRecord> {
        scores
            .iter()
            .map(|(name, score)| ScoreRecord {
                dataset: name.to_string(),
                score: *score,
            })
            .collect()
    }

    #[test]
    fn test_fractional_removes_lowest_third() {
        let records = ranked(&[
            ("a", Some(10.0)),
            ("b", Some(20.0)),
            ("c", Some(30.0)),
            ("d", Some(40.0)),
            ("e", Some(50.0)),
            ("f", Some(60.0)),
            ("g", Some(70.0)),
        ]);
        let policy = PrunePolicy::Fractional { denominator: 3 };
        assert_eq!(policy.select(&records), vec!["a", "b"]);
        assert!(policy.select(&records[..2]).is_empty());
    }

    #[test]
    fn test_threshold_removes_below() {
        let records = ranked(&[
            ("a", None),
            ("b", Some(40.0)),
            ("c", Some(52.0)),
            ("d", Some(60.0)),
            ("e", Some(70.0)),
        ]);
        let policy = PrunePolicy::Threshold {
            threshold: 52.0,
            floor: 3,
        };
        assert_eq!(policy.select(&records), vec!["a", "b"]);
    }

    #[test]
    fn test_threshold_respects_floor() {
        let records = ranked(&[
            ("a", Some(1.0)),
            ("b", Some(2.0)),
            ("c", Some(3.0)),
            ("d", Some(4.0)),
        ]);
        let policy = PrunePolicy::Threshold {
            threshold: 52.0,
            floor: 3,
        };
        assert_eq!(policy.select(&records), vec!["a"]);
        assert!(policy.select(&records[..3]).is_empty());
    }
}
