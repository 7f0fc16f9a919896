//! Intersection over Union (IoU) calculation.

use crate::types::BoundingBox;

/// Calculate the Intersection over Union (IoU) between two bounding boxes.
///
/// IoU is defined as the area of intersection divided by the area of union,
/// with boxes treated as continuous regions.
///
/// # Arguments
///
/// * `bbox1` - First bounding box
/// * `bbox2` - Second bounding box
///
/// # Returns
///
/// Returns a value between 0.0 (no overlap) and 1.0 (perfect overlap).
///
/// # Example
///
/// ```
/// use voc_map_eval::metrics::iou::calculate_iou;
/// use voc_map_eval::types::BoundingBox;
///
/// let bbox1 = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
/// let bbox2 = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
/// let iou = calculate_iou(&bbox1, &bbox2);
/// assert!(iou > 0.0 && iou < 1.0);
/// ```
pub fn calculate_iou(bbox1: &BoundingBox, bbox2: &BoundingBox) -> f64 {
    let intersection_area = intersection_area(bbox1, bbox2);
    if intersection_area <= 0.0 {
        return 0.0;
    }

    let union_area = bbox1.area() + bbox2.area() - intersection_area;
    if union_area <= 0.0 {
        return 0.0;
    }

    intersection_area / union_area
}

/// Intersection divided by the detection's own area.
///
/// Used against crowd regions, where a detection is judged by how much of it
/// falls inside the region rather than by the union.
pub fn calculate_crowd_iou(detection: &BoundingBox, crowd: &BoundingBox) -> f64 {
    let detection_area = detection.area();
    if detection_area <= 0.0 {
        return 0.0;
    }
    intersection_area(detection, crowd) / detection_area
}

/// Pascal VOC overlap with pixel-inclusive coordinates.
///
/// Widths and heights are `max - min + 1`, as in the VOC devkit. Returns
/// `None` when the boxes do not overlap at all.
///
/// # Example
///
/// ```
/// use voc_map_eval::metrics::iou::calculate_voc_iou;
/// use voc_map_eval::types::BoundingBox;
///
/// let bbox = BoundingBox::new(10.0, 20.0, 50.0, 80.0);
/// assert_eq!(calculate_voc_iou(&bbox, &bbox), Some(1.0));
/// assert_eq!(calculate_voc_iou(&bbox, &BoundingBox::new(60.0, 90.0, 70.0, 95.0)), None);
/// ```
pub fn calculate_voc_iou(detection: &BoundingBox, ground_truth: &BoundingBox) -> Option<f64> {
    let iw = detection.xmax.min(ground_truth.xmax) - detection.xmin.max(ground_truth.xmin) + 1.0;
    let ih = detection.ymax.min(ground_truth.ymax) - detection.ymin.max(ground_truth.ymin) + 1.0;
    if iw <= 0.0 || ih <= 0.0 {
        return None;
    }

    let inclusive_area =
        |b: &BoundingBox| (b.xmax - b.xmin + 1.0) * (b.ymax - b.ymin + 1.0);
    let union_area = inclusive_area(detection) + inclusive_area(ground_truth) - iw * ih;
    Some(iw * ih / union_area)
}

fn intersection_area(bbox1: &BoundingBox, bbox2: &BoundingBox) -> f64 {
    let x_left = bbox1.xmin.max(bbox2.xmin);
    let y_top = bbox1.ymin.max(bbox2.ymin);
    let x_right = bbox1.xmax.min(bbox2.xmax);
    let y_bottom = bbox1.ymax.min(bbox2.ymax);

    if x_right < x_left || y_bottom < y_top {
        return 0.0;
    }
    (x_right - x_left) * (y_bottom - y_top)
}
