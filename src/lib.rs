//! # voc-map-eval
//!
//! Detection-quality evaluation for object detectors on Pascal VOC style
//! datasets.
//!
//! A run is made of loosely coupled steps that talk through plain text files
//! under an output directory:
//!
//! 1. **Predictions**: a [`Detector`] is run on every test image and its
//!    boxes are written to `detection-results/<id>.txt`.
//! 2. **Ground truth**: VOC XML annotations are flattened into
//!    `ground-truth/<id>.txt`.
//! 3. **VOC mAP**: per-class AP at a fixed IoU, log-average miss rate and
//!    recall/precision/F1 at a score threshold, reported in
//!    `results/results.txt`.
//! 4. **COCO mAP**: the records are converted to COCO JSON and scored with
//!    the 0.50:0.95 bbox protocol.
//!
//! [`pipeline::run`] dispatches on [`MapMode`]:
//!
//! | mode | steps |
//! |---|---|
//! | 0 | 1, 2, 3 |
//! | 1 | 1 |
//! | 2 | 2 |
//! | 3 | 3 |
//! | 4 | 4 |
//!
//! ## Record formats
//!
//! ```text
//! ground-truth/<id>.txt       <class> <xmin> <ymin> <xmax> <ymax>[ difficult]
//! detection-results/<id>.txt  <class> <score> <left> <top> <right> <bottom>
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voc_map_eval::{pipeline, EvalConfig, MapMode, ReplayDetector};
//!
//! # fn main() -> voc_map_eval::Result<()> {
//! let config = EvalConfig {
//!     map_mode: MapMode::Full,
//!     ..Default::default()
//! };
//! let mut detector = ReplayDetector::from_file("detections.json")?;
//! let outcome = pipeline::run(&config, Some(&mut detector))?;
//!
//! if let Some(voc) = outcome.voc {
//!     println!("mAP@{}: {:.4}", voc.min_overlap, voc.map);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod loader;
pub mod annotation;
pub mod threshold;
pub mod stats;
pub mod nms;
pub mod metrics;
pub mod matching;
pub mod ground_truth;
pub mod detector;
pub mod evaluator;
pub mod coco;
pub mod pipeline;

// Re-export commonly used types and functions
pub use error::{MapEvalError, Result};
pub use types::{
    BoundingBox, ClassMetrics, CocoSummary, DetectionBox, DetectionRecord, GroundTruthRecord,
    OperatingPoint, VocMetrics,
};
pub use config::{EvalConfig, MapMode, OutputLayout};
pub use detector::{Detector, ReplayDetector};
pub use evaluator::get_map;
pub use coco::get_coco_map;
pub use pipeline::{run, PipelineOutcome};
