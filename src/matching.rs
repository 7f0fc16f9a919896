//! Detection matching for Pascal VOC evaluation.

use crate::metrics::iou::calculate_voc_iou;
use crate::types::{BoundingBox, GroundTruthRecord, MatchOutcome};
use std::collections::HashMap;

/// A detection of one class, tagged with the image it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDetection {
    pub image_id: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Outcome of matching one detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub image_id: String,
    pub confidence: f64,
    /// Best VOC overlap with any ground-truth box in the image, if any overlapped
    pub overlap: Option<f64>,
    /// Index of the best-overlapping ground-truth box within its image
    pub ground_truth_index: Option<usize>,
    pub outcome: MatchOutcome,
}

/// Ground-truth boxes of a single class in a single image, with used flags.
#[derive(Debug, Clone)]
struct ImageObjects<'a> {
    records: Vec<&'a GroundTruthRecord>,
    used: Vec<bool>,
}

/// Match the detections of one class against its ground truth.
///
/// Detections are stably ranked by descending confidence. Each one takes the
/// ground-truth box of its image with the highest pixel-inclusive overlap.
/// When that overlap reaches `min_overlap`:
///
/// - a difficult box makes the detection [`MatchOutcome::Ignored`],
/// - an unused box makes it a true positive and marks the box used,
/// - an already used box makes it a duplicate false positive.
///
/// Anything below `min_overlap` is a false positive.
///
/// # Arguments
///
/// * `detections` - All detections of the class, in file order
/// * `ground_truth` - Ground-truth records of the class, keyed by image id
/// * `min_overlap` - IoU needed for a true positive
///
/// # Returns
///
/// One [`Match`] per detection, in ranking order.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use voc_map_eval::matching::{match_detections, ClassDetection};
/// use voc_map_eval::types::{BoundingBox, GroundTruthRecord, MatchOutcome};
///
/// let bbox = BoundingBox::new(10.0, 20.0, 50.0, 80.0);
/// let mut ground_truth = HashMap::new();
/// ground_truth.insert(
///     "img1".to_string(),
///     vec![GroundTruthRecord { class_name: "egg".into(), bbox, difficult: false }],
/// );
/// let detections = vec![
///     ClassDetection { image_id: "img1".into(), confidence: 0.6, bbox },
///     ClassDetection { image_id: "img1".into(), confidence: 0.9, bbox },
/// ];
///
/// let matches = match_detections(&detections, &ground_truth, 0.5);
/// assert_eq!(matches[0].confidence, 0.9);
/// assert_eq!(matches[0].outcome, MatchOutcome::TruePositive);
/// assert_eq!(matches[1].outcome, MatchOutcome::FalsePositive);
/// ```
pub fn match_detections(
    detections: &[ClassDetection],
    ground_truth: &HashMap<String, Vec<GroundTruthRecord>>,
    min_overlap: f64,
) -> Vec<Match> {
    let mut objects: HashMap<&str, ImageObjects<'_>> = ground_truth
        .iter()
        .map(|(image_id, records)| {
            (
                image_id.as_str(),
                ImageObjects {
                    records: records.iter().collect(),
                    used: vec![false; records.len()],
                },
            )
        })
        .collect();

    // Stable sort keeps file order among equal confidences
    let mut ranked: Vec<&ClassDetection> = detections.iter().collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ranked
        .into_iter()
        .map(|detection| {
            let mut best: Option<(usize, f64)> = None;
            let image = objects.get_mut(detection.image_id.as_str());

            if let Some(image) = image.as_deref() {
                for (idx, record) in image.records.iter().enumerate() {
                    if let Some(overlap) = calculate_voc_iou(&detection.bbox, &record.bbox) {
                        if best.map_or(true, |(_, current)| overlap > current) {
                            best = Some((idx, overlap));
                        }
                    }
                }
            }

            let outcome = match (best, image) {
                (Some((idx, overlap)), Some(image)) if overlap >= min_overlap => {
                    if image.records[idx].difficult {
                        MatchOutcome::Ignored
                    } else if !image.used[idx] {
                        image.used[idx] = true;
                        MatchOutcome::TruePositive
                    } else {
                        MatchOutcome::FalsePositive
                    }
                }
                _ => MatchOutcome::FalsePositive,
            };

            Match {
                image_id: detection.image_id.clone(),
                confidence: detection.confidence,
                overlap: best.map(|(_, overlap)| overlap),
                ground_truth_index: best.map(|(idx, _)| idx),
                outcome,
            }
        })
        .collect()
}

/// Count the ground-truth boxes that act as positives (non-difficult).
pub fn count_positives(ground_truth: &HashMap<String, Vec<GroundTruthRecord>>) -> usize {
    ground_truth
        .values()
        .flat_map(|records| records.iter())
        .filter(|record| !record.difficult)
        .count()
}
