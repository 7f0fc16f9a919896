use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voc_map_eval::{pipeline, Detector, EvalConfig, MapMode, ReplayDetector};

#[derive(Parser, Debug)]
#[command(name = "get-map")]
#[command(about = "Compute VOC / COCO mAP for an object detector on a Pascal VOC dataset")]
struct Cli {
    /// 0 = full run, 1 = predictions, 2 = ground truth, 3 = VOC mAP, 4 = COCO mAP
    #[arg(long, default_value_t = 0)]
    map_mode: u8,

    /// Class list, one name per line
    #[arg(long, default_value = "model_data/target.txt")]
    classes_path: PathBuf,

    /// IoU needed for a true positive (mAP@0.5 by default)
    #[arg(long, default_value_t = 0.5)]
    min_overlap: f64,

    /// Minimum score for boxes written to the detection records
    #[arg(long, default_value_t = 0.001)]
    confidence: f64,

    /// IoU threshold for non-maximum suppression
    #[arg(long, default_value_t = 0.5)]
    nms_iou: f64,

    /// Maximum boxes written per image
    #[arg(long, default_value_t = 100)]
    max_boxes: usize,

    /// Score of the reported recall/precision/F1 operating point
    #[arg(long, default_value_t = 0.5)]
    score_threshold: f64,

    /// Skip the recall/precision/F1 report
    #[arg(long)]
    no_recall_precision: bool,

    /// Save a copy of every evaluated image under images-optional/
    #[arg(long)]
    map_vis: bool,

    #[arg(long, default_value = "VOCdevkit")]
    voc_devkit_path: PathBuf,

    /// Image directory (default: <devkit>/VOC2007/JPEGImages)
    #[arg(long)]
    image_dir: Option<PathBuf>,

    #[arg(long, default_value = "jpg")]
    image_extension: String,

    #[arg(long, default_value = "map_out")]
    map_out_path: PathBuf,

    /// Log progress every N images
    #[arg(long, default_value_t = 100)]
    progress_every: usize,

    /// Recorded detections (JSON keyed by image id) used as the detector
    #[arg(long)]
    detections: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(EvalConfig, Option<PathBuf>)> {
        let map_mode = MapMode::try_from(self.map_mode)?;
        let config = EvalConfig {
            map_mode,
            classes_path: self.classes_path,
            min_overlap: self.min_overlap,
            confidence: self.confidence,
            nms_iou: self.nms_iou,
            max_boxes: self.max_boxes,
            score_threshold: self.score_threshold,
            compute_recall_precision: !self.no_recall_precision,
            map_vis: self.map_vis,
            voc_devkit_path: self.voc_devkit_path,
            image_dir: self.image_dir,
            image_extension: self.image_extension,
            map_out_path: self.map_out_path,
            progress_every: self.progress_every,
        };
        Ok((config, self.detections))
    }
}

/// Record the resolved settings as `<out>/eval_config.json`.
fn write_config(config: &EvalConfig) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(&config.map_out_path)
        .with_context(|| format!("cannot create {}", config.map_out_path.display()))?;
    let config_path = config.map_out_path.join("eval_config.json");
    fs::write(&config_path, serde_json::to_string_pretty(config)?)
        .with_context(|| format!("cannot write {}", config_path.display()))?;
    Ok(config_path)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (config, detections) = Cli::parse().into_config()?;
    config.validate().context("invalid configuration")?;

    write_config(&config)?;

    let mut replay = match &detections {
        Some(path) => Some(
            ReplayDetector::from_file(path)
                .with_context(|| format!("cannot load detections from {}", path.display()))?,
        ),
        None => None,
    };
    let detector = replay.as_mut().map(|d| d as &mut dyn Detector);

    let outcome = pipeline::run(&config, detector).context("evaluation failed")?;

    if let Some(voc) = &outcome.voc {
        info!(map = voc.map, lamr = voc.mean_lamr(), "VOC mAP@{}", voc.min_overlap);
    }
    if let Some(coco) = &outcome.coco {
        info!(map = coco.map(), ap50 = coco.ap50(), ap75 = coco.ap75(), "COCO mAP");
    }
    Ok(())
}
