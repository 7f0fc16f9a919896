//! Non-Maximum Suppression (`NMS`) for detector output
//!
//! Suppression is applied per class: boxes of different classes never
//! suppress each other, matching the batched NMS used by YOLO-style heads.

use crate::error::{MapEvalError, Result};
use crate::metrics::iou::calculate_iou;
use crate::types::{BoundingBox, DetectionBox};
use std::collections::HashMap;

/// Detection with bounding box and confidence score
#[derive(Debug, Clone)]
pub struct Detection {
    /// Bounding box in corner format
    pub bbox: BoundingBox,
    /// Confidence score
    pub score: f64,
    /// Original index in the input
    pub index: usize,
}

/// Apply Non-Maximum Suppression to a set of detections
///
/// # Arguments
///
/// * `detections` - Vector of detections with bboxes and scores
/// * `iou_threshold` - `IoU` threshold for suppression (0.0 to 1.0)
///
/// # Returns
///
/// Boolean mask indicating which detections to keep
///
/// # Errors
///
/// Returns error if `iou_threshold` is not in range [0.0, 1.0]
///
/// # Examples
///
/// ```
/// # use voc_map_eval::nms::{Detection, non_maximum_suppression};
/// # use voc_map_eval::types::BoundingBox;
/// let detections = vec![
///     Detection { bbox: BoundingBox::new(10.0, 10.0, 50.0, 50.0), score: 0.9, index: 0 },
///     Detection { bbox: BoundingBox::new(15.0, 15.0, 55.0, 55.0), score: 0.8, index: 1 },
///     Detection { bbox: BoundingBox::new(100.0, 100.0, 150.0, 150.0), score: 0.95, index: 2 },
/// ];
///
/// let keep_mask = non_maximum_suppression(&detections, 0.5).unwrap();
/// assert_eq!(keep_mask, vec![true, false, true]);
/// ```
pub fn non_maximum_suppression(detections: &[Detection], iou_threshold: f64) -> Result<Vec<bool>> {
    if !(0.0..=1.0).contains(&iou_threshold) {
        return Err(MapEvalError::InvalidThreshold(format!(
            "IoU threshold must be between 0 and 1, got {iou_threshold}"
        )));
    }

    let n = detections.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut keep_mask = vec![true; n];

    // Stable sort keeps input order among equal scores
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| {
        detections[b]
            .score
            .partial_cmp(&detections[a].score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (i, &idx_i) in indices.iter().enumerate() {
        if !keep_mask[idx_i] {
            continue;
        }

        for &idx_j in &indices[(i + 1)..] {
            if !keep_mask[idx_j] {
                continue;
            }

            let iou = calculate_iou(&detections[idx_i].bbox, &detections[idx_j].bbox);
            if iou > iou_threshold {
                keep_mask[idx_j] = false;
            }
        }
    }

    Ok(keep_mask)
}

/// Apply NMS independently within each class.
///
/// Returns a keep mask aligned with `detections`.
pub fn class_wise_nms(detections: &[DetectionBox], iou_threshold: f64) -> Result<Vec<bool>> {
    let mut by_class: HashMap<&str, Vec<Detection>> = HashMap::new();
    for (index, det) in detections.iter().enumerate() {
        by_class
            .entry(det.class_name.as_str())
            .or_default()
            .push(Detection {
                bbox: det.bbox,
                score: det.score,
                index,
            });
    }

    let mut keep_mask = vec![false; detections.len()];
    for group in by_class.values() {
        let group_mask = non_maximum_suppression(group, iou_threshold)?;
        for (det, keep) in group.iter().zip(group_mask) {
            keep_mask[det.index] = keep;
        }
    }

    Ok(keep_mask)
}
