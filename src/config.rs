//! Run configuration: mode selection, thresholds and dataset/output paths.

use crate::error::{MapEvalError, Result};
use crate::threshold::validate_threshold;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which steps of the evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MapMode {
    /// Predictions, ground truth and VOC mAP.
    Full,
    PredictionsOnly,
    GroundTruthOnly,
    /// VOC mAP over records written by an earlier run.
    VocMapOnly,
    /// COCO 0.50:0.95 mAP over records written by an earlier run.
    CocoMapOnly,
}

impl MapMode {
    pub fn runs_predictions(self) -> bool {
        matches!(self, MapMode::Full | MapMode::PredictionsOnly)
    }

    pub fn runs_ground_truth(self) -> bool {
        matches!(self, MapMode::Full | MapMode::GroundTruthOnly)
    }

    pub fn runs_voc_map(self) -> bool {
        matches!(self, MapMode::Full | MapMode::VocMapOnly)
    }

    pub fn runs_coco_map(self) -> bool {
        self == MapMode::CocoMapOnly
    }
}

impl TryFrom<u8> for MapMode {
    type Error = MapEvalError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(MapMode::Full),
            1 => Ok(MapMode::PredictionsOnly),
            2 => Ok(MapMode::GroundTruthOnly),
            3 => Ok(MapMode::VocMapOnly),
            4 => Ok(MapMode::CocoMapOnly),
            other => Err(MapEvalError::InvalidMode(other)),
        }
    }
}

impl From<MapMode> for u8 {
    fn from(mode: MapMode) -> u8 {
        match mode {
            MapMode::Full => 0,
            MapMode::PredictionsOnly => 1,
            MapMode::GroundTruthOnly => 2,
            MapMode::VocMapOnly => 3,
            MapMode::CocoMapOnly => 4,
        }
    }
}

/// Settings for one evaluation run.
///
/// Defaults reproduce the usual VOC2007 test setup: mAP@0.5, predictions
/// generated at confidence 0.001 so the precision-recall curve is not
/// truncated, and recall/precision reported at score 0.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub map_mode: MapMode,
    /// Class list file, one name per line
    pub classes_path: PathBuf,
    /// IoU above which a detection counts as a true positive
    pub min_overlap: f64,
    /// Minimum score for a box to be written to the detection records
    pub confidence: f64,
    /// IoU threshold for non-maximum suppression
    pub nms_iou: f64,
    /// Maximum boxes written per image
    pub max_boxes: usize,
    /// Operating point for the reported recall/precision/F1
    pub score_threshold: f64,
    pub compute_recall_precision: bool,
    /// Save a copy of every evaluated image under `images-optional/`
    pub map_vis: bool,
    pub voc_devkit_path: PathBuf,
    /// Image directory; `<devkit>/VOC2007/JPEGImages` when unset
    pub image_dir: Option<PathBuf>,
    pub image_extension: String,
    pub map_out_path: PathBuf,
    /// Log progress every N images
    pub progress_every: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            map_mode: MapMode::Full,
            classes_path: PathBuf::from("model_data/target.txt"),
            min_overlap: 0.5,
            confidence: 0.001,
            nms_iou: 0.5,
            max_boxes: 100,
            score_threshold: 0.5,
            compute_recall_precision: true,
            map_vis: false,
            voc_devkit_path: PathBuf::from("VOCdevkit"),
            image_dir: None,
            image_extension: "jpg".to_string(),
            map_out_path: PathBuf::from("map_out"),
            progress_every: 100,
        }
    }
}

impl EvalConfig {
    fn voc_root(&self) -> PathBuf {
        self.voc_devkit_path.join("VOC2007")
    }

    /// Manifest listing the evaluation image identifiers.
    pub fn manifest_path(&self) -> PathBuf {
        self.voc_root().join("ImageSets").join("Main").join("test.txt")
    }

    pub fn annotations_dir(&self) -> PathBuf {
        self.voc_root().join("Annotations")
    }

    pub fn annotation_path(&self, image_id: &str) -> PathBuf {
        self.annotations_dir().join(format!("{image_id}.xml"))
    }

    pub fn image_dir(&self) -> PathBuf {
        self.image_dir
            .clone()
            .unwrap_or_else(|| self.voc_root().join("JPEGImages"))
    }

    pub fn image_path(&self, image_id: &str) -> PathBuf {
        self.image_dir()
            .join(format!("{}.{}", image_id, self.image_extension))
    }

    /// Output directory tree for this run.
    pub fn output(&self) -> OutputLayout {
        OutputLayout::new(&self.map_out_path)
    }

    /// Check thresholds and limits.
    ///
    /// # Errors
    ///
    /// Returns `InvalidThreshold` if any threshold lies outside [0.0, 1.0],
    /// or `MissingField` for a zero box cap or progress interval.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.min_overlap)?;
        validate_threshold(self.confidence)?;
        validate_threshold(self.nms_iou)?;
        validate_threshold(self.score_threshold)?;

        if self.max_boxes == 0 {
            return Err(MapEvalError::MissingField(
                "max_boxes must be greater than 0".to_string(),
            ));
        }
        if self.progress_every == 0 {
            return Err(MapEvalError::MissingField(
                "progress_every must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Paths of the generated record files under the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ground_truth_dir(&self) -> PathBuf {
        self.root.join("ground-truth")
    }

    pub fn detection_results_dir(&self) -> PathBuf {
        self.root.join("detection-results")
    }

    pub fn images_optional_dir(&self) -> PathBuf {
        self.root.join("images-optional")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    pub fn coco_eval_dir(&self) -> PathBuf {
        self.root.join("coco_eval")
    }

    pub fn ground_truth_file(&self, image_id: &str) -> PathBuf {
        self.ground_truth_dir().join(format!("{image_id}.txt"))
    }

    pub fn detection_results_file(&self, image_id: &str) -> PathBuf {
        self.detection_results_dir().join(format!("{image_id}.txt"))
    }

    /// Create the output root and its record directories if missing.
    ///
    /// Existing files are left untouched.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.ground_truth_dir(),
            self.detection_results_dir(),
            self.images_optional_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| MapEvalError::io(&dir, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EvalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.map_mode, MapMode::Full);
        assert_eq!(config.min_overlap, 0.5);
        assert_eq!(config.confidence, 0.001);
    }

    #[test]
    fn test_mode_conversion() {
        for value in 0u8..=4 {
            let mode = MapMode::try_from(value).unwrap();
            assert_eq!(u8::from(mode), value);
        }
        assert!(matches!(
            MapMode::try_from(5),
            Err(MapEvalError::InvalidMode(5))
        ));
    }

    #[test]
    fn test_mode_steps() {
        assert!(MapMode::Full.runs_predictions());
        assert!(MapMode::Full.runs_ground_truth());
        assert!(MapMode::Full.runs_voc_map());
        assert!(!MapMode::Full.runs_coco_map());

        assert!(MapMode::GroundTruthOnly.runs_ground_truth());
        assert!(!MapMode::GroundTruthOnly.runs_predictions());
        assert!(MapMode::CocoMapOnly.runs_coco_map());
        assert!(!MapMode::CocoMapOnly.runs_voc_map());
    }

    #[test]
    fn test_dataset_paths() {
        let config = EvalConfig {
            voc_devkit_path: PathBuf::from("data"),
            ..EvalConfig::default()
        };
        assert_eq!(
            config.manifest_path(),
            PathBuf::from("data/VOC2007/ImageSets/Main/test.txt")
        );
        assert_eq!(
            config.annotation_path("000001"),
            PathBuf::from("data/VOC2007/Annotations/000001.xml")
        );
        assert_eq!(
            config.image_path("000001"),
            PathBuf::from("data/VOC2007/JPEGImages/000001.jpg")
        );
    }

    #[test]
    fn test_image_dir_override() {
        let config = EvalConfig {
            image_dir: Some(PathBuf::from("/images")),
            image_extension: "png".to_string(),
            ..EvalConfig::default()
        };
        assert_eq!(config.image_path("a"), PathBuf::from("/images/a.png"));
    }

    #[test]
    fn test_invalid_thresholds() {
        let config = EvalConfig {
            min_overlap: 1.5,
            ..EvalConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MapEvalError::InvalidThreshold(_))
        ));

        let config = EvalConfig {
            max_boxes: 0,
            ..EvalConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_json_roundtrip_keeps_mode_numeric() {
        let config = EvalConfig {
            map_mode: MapMode::VocMapOnly,
            ..EvalConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"map_mode\":3"));

        let parsed: EvalConfig = serde_json::from_str(r#"{"map_mode": 2}"#).unwrap();
        assert_eq!(parsed.map_mode, MapMode::GroundTruthOnly);
        assert_eq!(parsed.nms_iou, 0.5);

        assert!(serde_json::from_str::<EvalConfig>(r#"{"map_mode": 9}"#).is_err());
    }
}
