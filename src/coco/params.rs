//! COCO bbox evaluation parameters.

/// Area range label and bounds, in squared pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaRange {
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
}

impl AreaRange {
    pub fn contains(&self, area: f64) -> bool {
        area >= self.min && area <= self.max
    }
}

/// Thresholds, area ranges and detection limits of a COCO evaluation.
///
/// Defaults follow pycocotools for bbox: 10 IoU thresholds (0.50:0.05:0.95),
/// 101 recall thresholds, all/small/medium/large areas and 1/10/100
/// detections per image.
#[derive(Debug, Clone)]
pub struct CocoParams {
    pub iou_thresholds: Vec<f64>,
    pub recall_thresholds: Vec<f64>,
    /// Ascending; the last entry caps detections during matching
    pub max_dets: Vec<usize>,
    pub area_ranges: Vec<AreaRange>,
}

impl Default for CocoParams {
    fn default() -> Self {
        Self {
            iou_thresholds: (0..10).map(|i| 0.5 + 0.05 * i as f64).collect(),
            recall_thresholds: (0..=100).map(|i| i as f64 / 100.0).collect(),
            max_dets: vec![1, 10, 100],
            area_ranges: vec![
                AreaRange { label: "all", min: 0.0, max: 1e10 },
                AreaRange { label: "small", min: 0.0, max: 32_f64.powi(2) },
                AreaRange { label: "medium", min: 32_f64.powi(2), max: 96_f64.powi(2) },
                AreaRange { label: "large", min: 96_f64.powi(2), max: 1e10 },
            ],
        }
    }
}

impl CocoParams {
    /// Largest per-image detection limit.
    pub fn max_det(&self) -> usize {
        self.max_dets.last().copied().unwrap_or(100)
    }

    pub fn area_index(&self, label: &str) -> Option<usize> {
        self.area_ranges.iter().position(|a| a.label == label)
    }

    pub fn max_det_index(&self, max_det: usize) -> Option<usize> {
        self.max_dets.iter().position(|&m| m == max_det)
    }

    pub fn iou_index(&self, threshold: f64) -> Option<usize> {
        self.iou_thresholds
            .iter()
            .position(|&t| (t - threshold).abs() < 1e-9)
    }
}
