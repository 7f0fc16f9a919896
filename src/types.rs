//! Core data types for ground-truth records, detections and evaluation results.

use serde::{Deserialize, Serialize};

/// Represents a bounding box in Pascal VOC corner format.
///
/// Coordinates are pixel positions:
/// - xmin / ymin: top-left corner
/// - xmax / ymax: bottom-right corner
///
/// Serialized as a `[xmin, ymin, xmax, ymax]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its corners.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Create a bounding box from COCO `[x, y, width, height]` values.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Get the area of the bounding box.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// COCO `[x, y, width, height]` representation.
    pub fn to_xywh(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.width(), self.height()]
    }

    pub fn to_xyxy(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_xyxy()
    }
}

/// One line of a `ground-truth/<id>.txt` file.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthRecord {
    pub class_name: String,
    pub bbox: BoundingBox,
    /// Marked `difficult` in the source annotation.
    pub difficult: bool,
}

/// One line of a `detection-results/<id>.txt` file.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    pub class_name: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// A raw box produced by a detector before filtering and suppression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    #[serde(rename = "class")]
    pub class_name: String,
    pub score: f64,
    pub bbox: BoundingBox,
}

impl DetectionBox {
    pub fn new(class_name: impl Into<String>, score: f64, bbox: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            score,
            bbox,
        }
    }
}

/// Recall, precision and F1 at a fixed confidence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OperatingPoint {
    pub score_threshold: f64,
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
}

/// VOC metrics for a single class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub class_name: String,
    /// All-point interpolated Average Precision
    pub ap: f64,
    /// Log-average miss rate
    pub lamr: f64,
    /// Non-difficult ground-truth objects
    pub num_ground_truth: usize,
    pub num_detections: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    /// Only present when recall/precision reporting is enabled
    pub operating_point: Option<OperatingPoint>,
}

/// Result of a VOC mAP run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VocMetrics {
    /// Mean of per-class AP values
    pub map: f64,
    /// IoU threshold defining a true positive
    pub min_overlap: f64,
    /// Number of ground-truth files evaluated
    pub num_images: usize,
    /// Per-class results, sorted by class name
    pub class_metrics: Vec<ClassMetrics>,
}

impl VocMetrics {
    /// Look up the metrics of one class.
    pub fn class(&self, class_name: &str) -> Option<&ClassMetrics> {
        self.class_metrics.iter().find(|m| m.class_name == class_name)
    }

    /// Mean log-average miss rate across classes.
    pub fn mean_lamr(&self) -> f64 {
        if self.class_metrics.is_empty() {
            return 0.0;
        }
        self.class_metrics.iter().map(|m| m.lamr).sum::<f64>() / self.class_metrics.len() as f64
    }
}

/// The standard 12-number COCO bbox summary.
///
/// Entries are `-1.0` where no ground truth exists for the slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CocoSummary {
    pub stats: [f64; 12],
}

impl CocoSummary {
    /// AP @[IoU=0.50:0.95 | area=all | maxDets=100]
    pub fn map(&self) -> f64 {
        self.stats[0]
    }

    pub fn ap50(&self) -> f64 {
        self.stats[1]
    }

    pub fn ap75(&self) -> f64 {
        self.stats[2]
    }

    pub fn ap_small(&self) -> f64 {
        self.stats[3]
    }

    pub fn ap_medium(&self) -> f64 {
        self.stats[4]
    }

    pub fn ap_large(&self) -> f64 {
        self.stats[5]
    }

    pub fn ar_1(&self) -> f64 {
        self.stats[6]
    }

    pub fn ar_10(&self) -> f64 {
        self.stats[7]
    }

    pub fn ar_100(&self) -> f64 {
        self.stats[8]
    }

    pub fn ar_small(&self) -> f64 {
        self.stats[9]
    }

    pub fn ar_medium(&self) -> f64 {
        self.stats[10]
    }

    pub fn ar_large(&self) -> f64 {
        self.stats[11]
    }
}

/// How a ranked detection counted during matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    TruePositive,
    FalsePositive,
    /// Matched an ignored (difficult or crowd) object; neither TP nor FP
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dimensions() {
        let bbox = BoundingBox::new(10.0, 20.0, 50.0, 80.0);
        assert_eq!(bbox.width(), 40.0);
        assert_eq!(bbox.height(), 60.0);
        assert_eq!(bbox.area(), 2400.0);
        assert_eq!(bbox.to_xywh(), [10.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn test_bbox_from_xywh() {
        let bbox = BoundingBox::from_xywh(10.0, 20.0, 40.0, 60.0);
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 50.0, 80.0));
    }

    #[test]
    fn test_detection_box_json_shape() {
        let json = r#"{"class": "egg", "score": 0.75, "bbox": [1.0, 2.0, 3.0, 4.0]}"#;
        let det: DetectionBox = serde_json::from_str(json).unwrap();
        assert_eq!(det.class_name, "egg");
        assert_eq!(det.bbox, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
    }
}
