//! COCO mAP over the generated record files.
//!
//! The text records are converted to COCO JSON under `coco_eval/` and then
//! scored with the COCO bbox protocol.

pub mod convert;
pub mod eval;
pub mod params;

pub use convert::{
    convert_detections, convert_ground_truth, CocoAnnotation, CocoDetection, CocoGroundTruth,
};
pub use eval::{format_summary, CocoEvaluator};
pub use params::CocoParams;

use crate::config::OutputLayout;
use crate::error::{MapEvalError, Result};
use crate::types::CocoSummary;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Compute the COCO summary for the record files under `path`.
///
/// Writes `coco_eval/instances_gt.json` and `coco_eval/instances_dr.json`,
/// prints the standard summary and returns it. Returns `Ok(None)` when no
/// detection of a listed class exists.
///
/// # Errors
///
/// * `EmptyDataset` if there is no ground-truth file
/// * `InvalidRecord` for malformed record lines
/// * `IoError` / `JsonError` when the JSON files cannot be written
pub fn get_coco_map<P: AsRef<Path>>(class_names: &[String], path: P) -> Result<Option<CocoSummary>> {
    let layout = OutputLayout::new(path);
    info!("Get coco map.");

    let coco_dir = layout.coco_eval_dir();
    fs::create_dir_all(&coco_dir).map_err(|e| MapEvalError::io(&coco_dir, e))?;

    let ground_truth = convert_ground_truth(&layout, class_names)?;
    convert::write_json(&ground_truth, coco_dir.join("instances_gt.json"))?;

    let detections = convert_detections(&layout, class_names, &ground_truth.image_index())?;
    convert::write_json(&detections, coco_dir.join("instances_dr.json"))?;

    if detections.is_empty() {
        warn!("No detections found, skipping COCO evaluation.");
        return Ok(None);
    }

    let mut evaluator = CocoEvaluator::new(&ground_truth, &detections);
    evaluator.evaluate();
    evaluator.accumulate();
    let summary = evaluator.summarize();

    if let Some(summary) = &summary {
        print!("{}", format_summary(summary));
        info!(map = summary.map(), ap50 = summary.ap50(), "Get coco map done.");
    }
    Ok(summary)
}
