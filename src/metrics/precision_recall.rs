//! Precision and Recall calculation.

use crate::types::MatchOutcome;

/// Container for precision and recall values.
#[derive(Debug, Clone)]
pub struct PrecisionRecall {
    pub precision: f64,
    pub recall: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// Calculate precision and recall from TP, FP, and FN counts.
///
/// # Example
///
/// ```
/// use voc_map_eval::metrics::precision_recall::calculate_precision_recall;
///
/// let pr = calculate_precision_recall(8, 2, 3);
/// assert_eq!(pr.precision, 0.8); // 8 / (8 + 2)
/// assert!((pr.recall - 0.7272).abs() < 0.001); // 8 / (8 + 3)
/// ```
pub fn calculate_precision_recall(
    true_positives: usize,
    false_positives: usize,
    false_negatives: usize,
) -> PrecisionRecall {
    let precision = if true_positives + false_positives > 0 {
        true_positives as f64 / (true_positives + false_positives) as f64
    } else {
        0.0
    };

    let recall = if true_positives + false_negatives > 0 {
        true_positives as f64 / (true_positives + false_negatives) as f64
    } else {
        0.0
    };

    PrecisionRecall {
        precision,
        recall,
        true_positives,
        false_positives,
        false_negatives,
    }
}

/// Running counts and ratios over a confidence-ranked list of detections.
///
/// Every vector has one entry per ranked detection. Ignored detections
/// advance neither counter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CumulativeCurve {
    pub true_positives: Vec<usize>,
    pub false_positives: Vec<usize>,
    pub recalls: Vec<f64>,
    pub precisions: Vec<f64>,
}

impl CumulativeCurve {
    pub fn len(&self) -> usize {
        self.recalls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recalls.is_empty()
    }

    /// Final true-positive count.
    pub fn total_true_positives(&self) -> usize {
        self.true_positives.last().copied().unwrap_or(0)
    }

    /// Final false-positive count.
    pub fn total_false_positives(&self) -> usize {
        self.false_positives.last().copied().unwrap_or(0)
    }
}

/// Build the cumulative precision-recall curve from ranked match outcomes.
///
/// Recall is `tp / num_ground_truth` (0 when there is no ground truth) and
/// precision is `tp / (tp + fp)` (0 while nothing has been counted).
///
/// # Example
///
/// ```
/// use voc_map_eval::metrics::precision_recall::cumulative_curve;
/// use voc_map_eval::types::MatchOutcome::*;
///
/// let curve = cumulative_curve(&[TruePositive, FalsePositive, TruePositive], 2);
/// assert_eq!(curve.recalls, vec![0.5, 0.5, 1.0]);
/// assert_eq!(curve.precisions[1], 0.5);
/// ```
pub fn cumulative_curve(outcomes: &[MatchOutcome], num_ground_truth: usize) -> CumulativeCurve {
    let mut curve = CumulativeCurve {
        true_positives: Vec::with_capacity(outcomes.len()),
        false_positives: Vec::with_capacity(outcomes.len()),
        recalls: Vec::with_capacity(outcomes.len()),
        precisions: Vec::with_capacity(outcomes.len()),
    };

    let mut tp = 0usize;
    let mut fp = 0usize;
    for outcome in outcomes {
        match outcome {
            MatchOutcome::TruePositive => tp += 1,
            MatchOutcome::FalsePositive => fp += 1,
            MatchOutcome::Ignored => {}
        }

        let recall = if num_ground_truth > 0 {
            tp as f64 / num_ground_truth as f64
        } else {
            0.0
        };
        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };

        curve.true_positives.push(tp);
        curve.false_positives.push(fp);
        curve.recalls.push(recall);
        curve.precisions.push(precision);
    }

    curve
}

/// Interpolate precision at the given recall levels.
///
/// Precision is first replaced by its monotone non-increasing envelope; each
/// level then takes the envelope value at the first point whose recall
/// reaches it, or 0 when recall never gets there.
///
/// # Arguments
///
/// * `precision` - Precision values in ranking order
/// * `recall` - Recall values in ranking order (non-decreasing)
/// * `recall_levels` - Sorted recall levels to sample
pub fn interpolate_precision(precision: &[f64], recall: &[f64], recall_levels: &[f64]) -> Vec<f64> {
    let n = precision.len().min(recall.len());
    let mut envelope = precision[..n].to_vec();
    for i in (1..n).rev() {
        if envelope[i] > envelope[i - 1] {
            envelope[i - 1] = envelope[i];
        }
    }

    recall_levels
        .iter()
        .map(|&level| {
            let idx = recall[..n].partition_point(|&r| r < level);
            envelope.get(idx).copied().unwrap_or(0.0)
        })
        .collect()
}
