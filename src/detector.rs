//! Prediction extraction: detector output to `detection-results/<id>.txt`.
//!
//! A [`Detector`] turns one image into raw boxes. The boxes are filtered by
//! confidence, suppressed per class, capped and written in the record
//! format `<class> <score> <left> <top> <right> <bottom>`.

use crate::config::EvalConfig;
use crate::error::{MapEvalError, Result};
use crate::loader::read_text;
use crate::nms::class_wise_nms;
use crate::stats::{ExtractionStats, Progress};
use crate::threshold::filter_by_confidence;
use crate::types::DetectionBox;
use image::DynamicImage;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Maximum characters kept from the rendered score.
const SCORE_WIDTH: usize = 6;

/// Source of raw detections for one image.
pub trait Detector {
    /// Detect objects in `image`. Boxes are in pixel corner coordinates.
    fn detect(&mut self, image_id: &str, image: &DynamicImage) -> Result<Vec<DetectionBox>>;
}

/// Serves detections recorded ahead of time, keyed by image id.
///
/// The JSON layout is
/// `{"<id>": [{"class": "egg", "score": 0.93, "bbox": [x1, y1, x2, y2]}]}`.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    detections: HashMap<String, Vec<DetectionBox>>,
}

impl ReplayDetector {
    pub fn new(detections: HashMap<String, Vec<DetectionBox>>) -> Self {
        Self { detections }
    }

    /// Parse recorded detections from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Load recorded detections from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = read_text(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Number of images with recorded detections.
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

impl Detector for ReplayDetector {
    fn detect(&mut self, image_id: &str, _image: &DynamicImage) -> Result<Vec<DetectionBox>> {
        Ok(self.detections.get(image_id).cloned().unwrap_or_default())
    }
}

/// Post-processing applied to raw detector output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcess {
    pub confidence: f64,
    pub nms_iou: f64,
    pub max_boxes: usize,
}

impl PostProcess {
    pub fn from_config(config: &EvalConfig) -> Self {
        Self {
            confidence: config.confidence,
            nms_iou: config.nms_iou,
            max_boxes: config.max_boxes,
        }
    }

    /// Confidence filter, class-wise NMS, descending score order and box cap.
    pub fn apply(&self, raw: &[DetectionBox], stats: &mut ExtractionStats) -> Result<Vec<DetectionBox>> {
        let confident = filter_by_confidence(raw, self.confidence)?;
        stats.skipped_low_confidence += raw.len() - confident.len();

        let keep = class_wise_nms(&confident, self.nms_iou)?;
        let before_nms = confident.len();
        let mut kept: Vec<DetectionBox> = confident
            .into_iter()
            .zip(keep)
            .filter_map(|(det, keep)| keep.then_some(det))
            .collect();
        stats.suppressed += before_nms - kept.len();

        kept.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        if kept.len() > self.max_boxes {
            stats.truncated += kept.len() - self.max_boxes;
            kept.truncate(self.max_boxes);
        }
        Ok(kept)
    }
}

/// Format one detection-record line (without the trailing newline).
///
/// The score keeps at most 6 characters of its decimal rendering and the
/// coordinates are truncated toward zero.
///
/// # Example
///
/// ```
/// use voc_map_eval::detector::format_detection_line;
/// use voc_map_eval::types::{BoundingBox, DetectionBox};
///
/// let det = DetectionBox::new("egg", 0.912345678, BoundingBox::new(10.7, 20.2, 50.9, 80.5));
/// assert_eq!(format_detection_line(&det), "egg 0.9123 10 20 50 80");
/// ```
pub fn format_detection_line(detection: &DetectionBox) -> String {
    let score = detection.score.to_string();
    let score: String = score.chars().take(SCORE_WIDTH).collect();
    let b = &detection.bbox;
    format!(
        "{} {} {} {} {} {}",
        detection.class_name,
        score,
        b.xmin as i64,
        b.ymin as i64,
        b.xmax as i64,
        b.ymax as i64
    )
}

/// Run the detector on one image and write its detection-record file.
///
/// The file is created even when no box survives.
pub fn write_detection_results(
    detector: &mut dyn Detector,
    image_id: &str,
    image: &DynamicImage,
    class_names: &[String],
    post: &PostProcess,
    output_path: &Path,
    stats: &mut ExtractionStats,
) -> Result<()> {
    let raw = detector.detect(image_id, image)?;
    let boxes = post.apply(&raw, stats)?;

    let mut content = String::new();
    let mut written = 0;
    for det in &boxes {
        if !class_names.iter().any(|name| *name == det.class_name) {
            stats.skip_unknown_class();
            continue;
        }
        content.push_str(&format_detection_line(det));
        content.push('\n');
        stats.add_record(false);
        written += 1;
    }
    stats.finish_image(written);

    fs::write(output_path, content).map_err(|e| MapEvalError::io(output_path, e))?;
    debug!(path = %output_path.display(), boxes = written, "wrote detections");
    Ok(())
}

/// Write `detection-results/<id>.txt` for every image identifier.
///
/// Images are read from [`EvalConfig::image_path`]. With `map_vis` set, a
/// JPEG copy is saved under `images-optional/`. Any unreadable image aborts
/// the extraction.
pub fn extract_predictions(
    config: &EvalConfig,
    image_ids: &[String],
    class_names: &[String],
    detector: &mut dyn Detector,
) -> Result<ExtractionStats> {
    info!(images = image_ids.len(), "Get predict result.");

    let output = config.output();
    let post = PostProcess::from_config(config);
    let mut stats = ExtractionStats::new();
    let progress = Progress::new("predictions", image_ids.len(), config.progress_every);

    for (idx, image_id) in image_ids.iter().enumerate() {
        let image_path = config.image_path(image_id);
        debug!(path = %image_path.display(), "reading image");
        let image = image::open(&image_path).map_err(|e| MapEvalError::image(&image_path, e))?;

        if config.map_vis {
            let copy = output.images_optional_dir().join(format!("{image_id}.jpg"));
            DynamicImage::ImageRgb8(image.to_rgb8())
                .save(&copy)
                .map_err(|e| MapEvalError::image(&copy, e))?;
        }

        write_detection_results(
            detector,
            image_id,
            &image,
            class_names,
            &post,
            &output.detection_results_file(image_id),
            &mut stats,
        )?;
        progress.tick(idx + 1);
    }

    stats.log_summary("predictions");
    info!("Get predict result done.");
    Ok(stats)
}
