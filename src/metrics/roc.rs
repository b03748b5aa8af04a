//! Receiver operating characteristic curve and area under it
//!
//! Construction follows the usual convention: one point per distinct score
//! in decreasing order, a leading `+inf` threshold at (0, 0), and
//! intermediate points that lie on a straight segment removed. A point's
//! rates are those obtained by predicting class 1 for `score >= threshold`.

use std::cmp::Ordering;

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RocError {
    #[error("ROC is undefined with a single class in the ground truth")]
    SingleClass,
    #[error("ROC needs at least one sample")]
    Empty,
    #[error("label count {labels} does not match score count {scores}")]
    LengthMismatch { labels: usize, scores: usize },
    #[error("scores contain non-finite values")]
    NonFiniteScore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
}

impl RocCurve {
    /// Area under the curve by the trapezoidal rule.
    pub fn auc(&self) -> f64 {
        self.fpr
            .windows(2)
            .zip(self.tpr.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[1] + y[0]) / 2.0)
            .sum()
    }

    /// Last threshold whose false-positive rate is strictly below `cutoff`.
    ///
    /// Rates are non-decreasing along the curve, so this is the most
    /// permissive operating point that keeps the false-alarm rate under the
    /// cutoff. The leading `+inf` point always qualifies for a positive cutoff.
    pub fn threshold_below(&self, cutoff: f64) -> Option<f64> {
        self.fpr
            .iter()
            .zip(&self.thresholds)
            .filter(|(fpr, _)| **fpr < cutoff)
            .map(|(_, t)| *t)
            .last()
    }
}

/// Build the ROC curve of binary `actual` labels against `scores`.
pub fn roc_curve(actual: &[u8], scores: &[f64]) -> Result<RocCurve, RocError> {
    if actual.len() != scores.len() {
        return Err(RocError::LengthMismatch {
            labels: actual.len(),
            scores: scores.len(),
        });
    }
    if actual.is_empty() {
        return Err(RocError::Empty);
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(RocError::NonFiniteScore);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let mut tps = Vec::new();
    let mut fps = Vec::new();
    let mut thresholds = Vec::new();
    let (mut tp, mut fp) = (0.0_f64, 0.0_f64);
    for (pos, &i) in order.iter().enumerate() {
        if actual[i] > 0 {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        let distinct_next = order
            .get(pos + 1)
            .map_or(true, |&next| scores[next] != scores[i]);
        if distinct_next {
            tps.push(tp);
            fps.push(fp);
            thresholds.push(scores[i]);
        }
    }

    let positives = tp;
    let negatives = fp;
    if positives == 0.0 || negatives == 0.0 {
        return Err(RocError::SingleClass);
    }

    // Drop points collinear with both neighbours
    let n = tps.len();
    let keep: Vec<bool> = (0..n)
        .map(|i| {
            if i == 0 || i + 1 == n {
                return true;
            }
            let dfp = fps[i + 1] - 2.0 * fps[i] + fps[i - 1];
            let dtp = tps[i + 1] - 2.0 * tps[i] + tps[i - 1];
            dfp != 0.0 || dtp != 0.0
        })
        .collect();

    let mut curve = RocCurve {
        fpr: vec![0.0],
        tpr: vec![0.0],
        thresholds: vec![f64::INFINITY],
    };
    for i in (0..n).filter(|&i| keep[i]) {
        curve.fpr.push(fps[i] / negatives);
        curve.tpr.push(tps[i] / positives);
        curve.thresholds.push(thresholds[i]);
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_separation() {
        let curve = roc_curve(&[1, 1, 0, 0], &[0.9, 0.8, 0.2, 0.1]).unwrap();
        assert_eq!(curve.fpr, vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(curve.tpr, vec![0.0, 0.5, 1.0, 1.0]);
        assert_eq!(curve.thresholds[2], 0.8);
        assert!((curve.auc() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_collapse_to_one_point() {
        let curve = roc_curve(&[1, 0, 1, 0], &[0.5, 0.5, 0.5, 0.5]).unwrap();
        assert_eq!(curve.thresholds.len(), 2);
        assert!((curve.auc() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_scores() {
        let curve = roc_curve(&[0, 0, 1, 1], &[0.9, 0.8, 0.2, 0.1]).unwrap();
        assert!(curve.auc().abs() < 1e-12);
        assert_eq!(curve.threshold_below(0.3), Some(f64::INFINITY));
    }

    #[test]
    fn test_auc_known_value() {
        // sklearn reference: roc_auc_score([0,0,1,1], [0.1,0.4,0.35,0.8]) == 0.75
        let curve = roc_curve(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
        assert!((curve.auc() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_is_error() {
        assert_eq!(
            roc_curve(&[0, 0, 0], &[0.1, 0.2, 0.3]),
            Err(RocError::SingleClass)
        );
        assert_eq!(roc_curve(&[1], &[0.3]), Err(RocError::SingleClass));
    }

    #[test]
    fn test_input_validation() {
        assert_eq!(roc_curve(&[], &[]), Err(RocError::Empty));
        assert!(matches!(
            roc_curve(&[1, 0], &[0.5]),
            Err(RocError::LengthMismatch { .. })
        ));
        assert_eq!(
            roc_curve(&[1, 0], &[f64::NAN, 0.5]),
            Err(RocError::NonFiniteScore)
        );
    }

    #[test]
    fn test_threshold_below_cutoff() {
        // 10 negatives spread over scores, 2 positives on top
        let actual = [1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let scores: Vec<f64> = (0..12).map(|i| 1.0 - i as f64 * 0.05).collect();
        let curve = roc_curve(&actual, &scores).unwrap();
        let t = curve.threshold_below(0.29).unwrap();
        let fp = scores
            .iter()
            .zip(actual)
            .filter(|(s, a)| **s >= t && *a == 0)
            .count();
        assert!((fp as f64 / 10.0) < 0.29);
    }
}
