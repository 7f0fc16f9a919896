//! Mode dispatch over the evaluation steps.

use crate::coco::get_coco_map;
use crate::config::EvalConfig;
use crate::detector::{extract_predictions, Detector};
use crate::error::{MapEvalError, Result};
use crate::evaluator::get_map;
use crate::ground_truth::extract_ground_truth;
use crate::loader::{load_class_names, load_image_ids};
use crate::stats::ExtractionStats;
use crate::types::{CocoSummary, VocMetrics};
use serde::Serialize;
use tracing::info;

/// What one run produced. Steps that did not run are `None`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineOutcome {
    pub predictions: Option<ExtractionStats>,
    pub ground_truth: Option<ExtractionStats>,
    pub voc: Option<VocMetrics>,
    pub coco: Option<CocoSummary>,
}

/// Run the steps selected by `config.map_mode`.
///
/// The output tree is created first. The manifest is read only when a
/// record-writing step runs and the class list only when a step needs it.
///
/// # Errors
///
/// * `Detector` if predictions are requested without a detector
/// * any error of the individual steps, which aborts the run
pub fn run(config: &EvalConfig, detector: Option<&mut dyn Detector>) -> Result<PipelineOutcome> {
    config.validate()?;
    let mode = config.map_mode;
    info!(mode = u8::from(mode), out = %config.map_out_path.display(), "starting evaluation");

    let output = config.output();
    output.ensure_dirs()?;

    let mut outcome = PipelineOutcome::default();

    let image_ids = if mode.runs_predictions() || mode.runs_ground_truth() {
        load_image_ids(config.manifest_path())?
    } else {
        Vec::new()
    };
    let class_names = if mode.runs_predictions() || mode.runs_ground_truth() || mode.runs_coco_map() {
        load_class_names(&config.classes_path)?
    } else {
        Vec::new()
    };

    if mode.runs_predictions() {
        let detector = detector.ok_or_else(|| {
            MapEvalError::Detector(format!(
                "map mode {} needs a detector",
                u8::from(mode)
            ))
        })?;
        outcome.predictions = Some(extract_predictions(config, &image_ids, &class_names, detector)?);
    }

    if mode.runs_ground_truth() {
        outcome.ground_truth = Some(extract_ground_truth(config, &image_ids, &class_names)?);
    }

    if mode.runs_voc_map() {
        outcome.voc = Some(get_map(
            config.min_overlap,
            config.compute_recall_precision,
            config.score_threshold,
            &config.map_out_path,
        )?);
    }

    if mode.runs_coco_map() {
        outcome.coco = get_coco_map(&class_names, &config.map_out_path)?;
    }

    Ok(outcome)
}
