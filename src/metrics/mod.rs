//! Defect-prediction quality metrics with an adaptive decision threshold
//!
//! Turns (actual labels, hard predictions, positive-class probabilities)
//! into eight comparable scalars. The decision threshold is not fixed at
//! 0.5: it is read off the ROC curve as the most permissive operating point
//! whose false-alarm rate stays below a cutoff drawn uniformly from
//! [0.27, 0.31] on every call.
//!
//! Degenerate inputs never produce NaN. Each undefined ratio falls back to 0
//! on its own, an undefined ROC falls back to AUROC 0 and the supplied hard
//! predictions, and a record that still contains NaN is replaced by zeros.
//! Every fallback taken is listed on the returned [`Assessment`].

mod roc;

pub use roc::{roc_curve, RocCurve, RocError};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Range the false-alarm cutoff is drawn from.
pub const CUTOFF_RANGE: std::ops::RangeInclusive<f64> = 0.27..=0.31;

/// Output scaling of the eight scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Multiplied by 100
    #[default]
    Percent,
    /// Raw fractions in 0..1
    Fraction,
}

/// The eight detection-quality scores of one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// Probability of detection, TP / (TP + FN)
    pub pd: f64,
    /// Probability of false alarm, FP / (FP + TN)
    pub pf: f64,
    pub precision: f64,
    /// Same as `pd`
    pub recall: f64,
    pub f1: f64,
    /// sqrt(0.7 (1 - pd)^2 + 0.3 pf^2)
    pub distance_to_ideal: f64,
    /// sqrt(pd (1 - pf))
    pub g: f64,
    pub auroc: f64,
}

impl Scores {
    pub const ZERO: Scores = Scores {
        pd: 0.0,
        pf: 0.0,
        precision: 0.0,
        recall: 0.0,
        f1: 0.0,
        distance_to_ideal: 0.0,
        g: 0.0,
        auroc: 0.0,
    };

    /// Scores in declaration order: pd, pf, precision, recall, f1,
    /// distance-to-ideal, g, auroc.
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.pd,
            self.pf,
            self.precision,
            self.recall,
            self.f1,
            self.distance_to_ideal,
            self.g,
            self.auroc,
        ]
    }

    fn any_nan(&self) -> bool {
        self.to_array().iter().any(|v| v.is_nan())
    }

    fn scaled(self, factor: f64) -> Scores {
        Scores {
            pd: self.pd * factor,
            pf: self.pf * factor,
            precision: self.precision * factor,
            recall: self.recall * factor,
            f1: self.f1 * factor,
            distance_to_ideal: self.distance_to_ideal * factor,
            g: self.g * factor,
            auroc: self.auroc * factor,
        }
    }
}

/// Binary confusion matrix counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl Confusion {
    pub fn tally(actual: &[u8], predicted: &[u8]) -> Self {
        let mut c = Confusion::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a > 0, p > 0) {
                (true, true) => c.tp += 1,
                (false, true) => c.fp += 1,
                (false, false) => c.tn += 1,
                (true, false) => c.fn_ += 1,
            }
        }
        c
    }
}

/// Which ratio hit a zero denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Ratio {
    Detection,
    FalseAlarm,
    Precision,
    F1,
}

/// A documented fallback taken while scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFallback {
    /// ROC could not be built: AUROC is 0 and the supplied hard predictions
    /// (binarized at `> 0`) are scored instead of the adaptive threshold.
    Roc(RocError),
    /// The ratio's denominator was zero; it was scored as 0.
    ZeroDenominator(Ratio),
    /// A score was still NaN; the whole record was replaced with zeros.
    NonFinite,
}

/// Scores plus how they were obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub scores: Scores,
    pub confusion: Confusion,
    /// The false-alarm cutoff used for threshold selection
    pub cutoff: f64,
    /// Decision threshold read off the ROC curve, if one was available
    pub threshold: Option<f64>,
    pub fallbacks: Vec<MetricFallback>,
}

impl Assessment {
    /// The ROC was unavailable or the record was zeroed.
    pub fn is_degenerate(&self) -> bool {
        self.fallbacks
            .iter()
            .any(|f| matches!(f, MetricFallback::Roc(_) | MetricFallback::NonFinite))
    }
}

/// Draw a false-alarm cutoff from [`CUTOFF_RANGE`].
pub fn draw_cutoff<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.random_range(CUTOFF_RANGE)
}

/// Computes [`Scores`] for classifier output.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsEngine {
    scale: Scale,
}

impl MetricsEngine {
    pub fn new(scale: Scale) -> Self {
        Self { scale }
    }

    /// Score with a freshly drawn false-alarm cutoff.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        actual: &[f64],
        predicted: &[f64],
        distribution: &[f64],
        rng: &mut R,
    ) -> Assessment {
        let cutoff = draw_cutoff(rng);
        self.evaluate_with_cutoff(actual, predicted, distribution, cutoff)
    }

    /// Score with an injected cutoff. Deterministic in its inputs.
    pub fn evaluate_with_cutoff(
        &self,
        actual: &[f64],
        predicted: &[f64],
        distribution: &[f64],
        cutoff: f64,
    ) -> Assessment {
        let actual: Vec<u8> = actual.iter().map(|&a| u8::from(a > 0.0)).collect();
        let mut fallbacks = Vec::new();

        let (predicted, threshold, auroc) = match roc_curve(&actual, distribution) {
            Ok(curve) => {
                let threshold = curve.threshold_below(cutoff).unwrap_or(f64::INFINITY);
                // Inclusive: the ROC threshold is itself a score, so a strict
                // comparison would drop the lowest positive at perfect separation
                let hard: Vec<u8> = distribution
                    .iter()
                    .map(|&p| u8::from(p >= threshold))
                    .collect();
                let auroc = (curve.auc() * 100.0).round() / 100.0;
                (hard, Some(threshold), auroc)
            }
            Err(e) => {
                fallbacks.push(MetricFallback::Roc(e));
                let hard: Vec<u8> = predicted.iter().map(|&p| u8::from(p > 0.0)).collect();
                (hard, None, 0.0)
            }
        };

        let confusion = Confusion::tally(&actual, &predicted);
        let (tp, fp, tn, fn_) = (
            confusion.tp as f64,
            confusion.fp as f64,
            confusion.tn as f64,
            confusion.fn_ as f64,
        );

        let mut ratio = |num: f64, den: f64, which: Ratio| {
            if den == 0.0 {
                fallbacks.push(MetricFallback::ZeroDenominator(which));
                0.0
            } else {
                num / den
            }
        };
        let pd = ratio(tp, tp + fn_, Ratio::Detection);
        let pf = ratio(fp, fp + tn, Ratio::FalseAlarm);
        let precision = ratio(tp, tp + fp, Ratio::Precision);
        let f1 = ratio(2.0 * tp, 2.0 * tp + fp + fn_, Ratio::F1);

        let mut scores = Scores {
            pd,
            pf,
            precision,
            recall: pd,
            f1,
            distance_to_ideal: (0.7 * (1.0 - pd).powi(2) + 0.3 * pf.powi(2)).sqrt(),
            g: (pd * (1.0 - pf)).sqrt(),
            auroc,
        };

        if scores.any_nan() {
            fallbacks.push(MetricFallback::NonFinite);
            scores = Scores::ZERO;
        }

        let scores = match self.scale {
            Scale::Percent => scores.scaled(100.0),
            Scale::Fraction => scores,
        };

        Assessment {
            scores,
            confusion,
            cutoff,
            threshold,
            fallbacks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_separation_percent() {
        let engine = MetricsEngine::default();
        let a = engine.evaluate_with_cutoff(
            &[1.0, 1.0, 0.0, 0.0],
            &[1.0, 1.0, 0.0, 0.0],
            &[0.9, 0.8, 0.2, 0.1],
            0.29,
        );
        assert!(close(a.scores.pd, 100.0));
        assert!(close(a.scores.pf, 0.0));
        assert!(close(a.scores.auroc, 100.0));
        assert!(close(a.scores.g, 100.0));
        assert!(close(a.scores.precision, 100.0));
        assert!(close(a.scores.f1, 100.0));
        assert!(close(a.scores.distance_to_ideal, 0.0));
        assert!(a.fallbacks.is_empty());
    }

    #[test]
    fn test_score_equal_to_threshold_is_positive() {
        let engine = MetricsEngine::default();
        let a = engine.evaluate_with_cutoff(
            &[1.0, 1.0, 0.0, 0.0],
            &[0.0, 0.0, 0.0, 0.0],
            &[0.9, 0.8, 0.2, 0.1],
            0.29,
        );
        assert_eq!(a.threshold, Some(0.8));
        assert_eq!(a.confusion.tp, 2);
        assert_eq!(a.confusion.fn_, 0);
    }

    #[test]
    fn test_perfect_separation_any_cutoff() {
        let engine = MetricsEngine::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..20 {
            let a = engine.evaluate(
                &[1.0, 1.0, 0.0, 0.0],
                &[0.0, 0.0, 0.0, 0.0],
                &[0.9, 0.8, 0.2, 0.1],
                &mut rng,
            );
            assert!(CUTOFF_RANGE.contains(&a.cutoff));
            assert!(close(a.scores.pd, 100.0));
            assert!(close(a.scores.pf, 0.0));
        }
    }

    #[test]
    fn test_all_negative_actual_never_nan() {
        let engine = MetricsEngine::default();
        let a = engine.evaluate_with_cutoff(
            &[0.0, 0.0, 0.0],
            &[1.0, 0.0, 1.0],
            &[0.7, 0.2, 0.9],
            0.28,
        );
        assert_eq!(a.scores.pd, 0.0);
        assert_eq!(a.scores.g, 0.0);
        assert_eq!(a.scores.auroc, 0.0);
        assert!(a.scores.to_array().iter().all(|v| v.is_finite()));
        assert!(a.fallbacks.contains(&MetricFallback::Roc(RocError::SingleClass)));
        assert!(a
            .fallbacks
            .contains(&MetricFallback::ZeroDenominator(Ratio::Detection)));
        assert!(a.is_degenerate());
        // fallback predictions were used: two false alarms out of three
        assert!(close(a.scores.pf, 200.0 / 3.0));
    }

    #[test]
    fn test_fraction_scale() {
        let engine = MetricsEngine::new(Scale::Fraction);
        let a = engine.evaluate_with_cutoff(
            &[1.0, 1.0, 0.0, 0.0],
            &[1.0, 1.0, 0.0, 0.0],
            &[0.9, 0.8, 0.2, 0.1],
            0.29,
        );
        assert!(close(a.scores.pd, 1.0));
        assert!(close(a.scores.auroc, 1.0));
    }

    #[test]
    fn test_threshold_from_roc_overrides_predictions() {
        let engine = MetricsEngine::new(Scale::Fraction);
        // 4 positives, 6 negatives; one negative scores above two positives
        let actual = [1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let dist = [0.95, 0.9, 0.85, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2];
        let a = engine.evaluate_with_cutoff(&actual, &[0.0; 10], &dist, 0.3);
        // fpr 1/6 < 0.3 at t = 0.7, next point has fpr 2/6 > 0.3
        assert_eq!(a.threshold, Some(0.7));
        assert_eq!(
            a.confusion,
            Confusion {
                tp: 4,
                fp: 1,
                tn: 5,
                fn_: 0
            }
        );
        assert!(close(a.scores.pd, 1.0));
        assert!(close(a.scores.pf, 1.0 / 6.0));
        assert!(close(a.scores.g, (5.0f64 / 6.0).sqrt()));
        assert!(close(a.scores.precision, 0.8));
    }

    #[test]
    fn test_auroc_rounded_to_two_decimals() {
        let engine = MetricsEngine::new(Scale::Fraction);
        // AUC = 2/3 exactly
        let a = engine.evaluate_with_cutoff(
            &[1.0, 0.0, 1.0, 0.0, 0.0],
            &[0.0; 5],
            &[0.9, 0.8, 0.5, 0.1, 0.6],
            0.29,
        );
        assert!(close(a.scores.auroc, 0.67));
    }

    #[test]
    fn test_same_cutoff_same_output() {
        let engine = MetricsEngine::default();
        let actual = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let dist = [0.7, 0.4, 0.35, 0.8, 0.9, 0.1];
        let pred = [1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let a = engine.evaluate_with_cutoff(&actual, &pred, &dist, 0.3);
        let b = engine.evaluate_with_cutoff(&actual, &pred, &dist, 0.3);
        assert_eq!(a, b);

        let mut r1 = ChaCha8Rng::seed_from_u64(99);
        let mut r2 = ChaCha8Rng::seed_from_u64(99);
        assert_eq!(
            engine.evaluate(&actual, &pred, &dist, &mut r1),
            engine.evaluate(&actual, &pred, &dist, &mut r2)
        );
    }

    #[test]
    fn test_confusion_tally() {
        let c = Confusion::tally(&[1, 1, 0, 0, 1], &[1, 0, 1, 0, 1]);
        assert_eq!(
            c,
            Confusion {
                tp: 2,
                fp: 1,
                tn: 1,
                fn_: 1
            }
        );
    }
}
