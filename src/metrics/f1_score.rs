//! F1 Score calculation.

use crate::metrics::precision_recall::{calculate_precision_recall, CumulativeCurve, PrecisionRecall};
use crate::types::OperatingPoint;

/// Calculate F1 score from precision and recall.
///
/// F1 score is the harmonic mean of precision and recall:
/// F1 = 2 × (Precision × Recall) / (Precision + Recall)
///
/// Returns 0.0 if both precision and recall are 0.
///
/// # Example
///
/// ```
/// use voc_map_eval::metrics::f1_score::calculate_f1_score;
///
/// let f1 = calculate_f1_score(0.8, 0.6);
/// assert!((f1 - 0.6857).abs() < 0.001);
/// ```
pub fn calculate_f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }

    2.0 * (precision * recall) / (precision + recall)
}

/// Calculate F1 score from a PrecisionRecall struct.
pub fn calculate_f1_from_pr(pr: &PrecisionRecall) -> f64 {
    calculate_f1_score(pr.precision, pr.recall)
}

/// Recall, precision and F1 at a confidence threshold.
///
/// `scores` are the confidences of the ranked detections behind `curve`
/// (descending). The operating point is the last detection whose score is
/// at least `score_threshold`; when no detection reaches it every value is 0.
///
/// # Example
///
/// ```
/// use voc_map_eval::metrics::f1_score::operating_point;
/// use voc_map_eval::metrics::precision_recall::cumulative_curve;
/// use voc_map_eval::types::MatchOutcome::*;
///
/// let curve = cumulative_curve(&[TruePositive, FalsePositive, TruePositive], 2);
/// let point = operating_point(&[0.9, 0.6, 0.3], &curve, 2, 0.5);
/// assert_eq!(point.recall, 0.5);
/// assert_eq!(point.precision, 0.5);
/// ```
pub fn operating_point(
    scores: &[f64],
    curve: &CumulativeCurve,
    num_ground_truth: usize,
    score_threshold: f64,
) -> OperatingPoint {
    let last = scores
        .iter()
        .take(curve.len())
        .rposition(|&score| score >= score_threshold);

    let Some(index) = last else {
        return OperatingPoint {
            score_threshold,
            ..OperatingPoint::default()
        };
    };

    let tp = curve.true_positives[index];
    let fp = curve.false_positives[index];
    let pr = calculate_precision_recall(tp, fp, num_ground_truth.saturating_sub(tp));

    OperatingPoint {
        score_threshold,
        recall: pr.recall,
        precision: pr.precision,
        f1: calculate_f1_from_pr(&pr),
    }
}
