//! Conversion of the text record files into COCO JSON.

use crate::config::OutputLayout;
use crate::error::{MapEvalError, Result};
use crate::loader::{list_record_files, read_detection_file, read_ground_truth_file};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u64,
    pub name: String,
    pub supercategory: String,
}

/// A ground-truth object in COCO form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,
    /// `[x, y, width, height]`
    pub bbox: [f64; 4],
    pub area: f64,
    /// 1 for difficult objects, which are only ever ignored
    pub iscrowd: u8,
}

impl CocoAnnotation {
    pub fn is_crowd(&self) -> bool {
        self.iscrowd != 0
    }
}

/// A detection in the COCO results format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoDetection {
    pub image_id: u64,
    pub category_id: u64,
    pub bbox: [f64; 4],
    pub score: f64,
}

impl CocoDetection {
    pub fn area(&self) -> f64 {
        self.bbox[2] * self.bbox[3]
    }
}

/// Ground-truth dataset (`instances_gt.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoGroundTruth {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

impl CocoGroundTruth {
    /// Image id assigned to each record-file stem.
    pub fn image_index(&self) -> HashMap<String, u64> {
        self.images
            .iter()
            .map(|image| {
                let stem = image
                    .file_name
                    .strip_suffix(".jpg")
                    .unwrap_or(&image.file_name);
                (stem.to_string(), image.id)
            })
            .collect()
    }
}

fn category_id(class_names: &[String], class_name: &str) -> Option<u64> {
    class_names
        .iter()
        .position(|name| name == class_name)
        .map(|idx| idx as u64 + 1)
}

/// Build the COCO ground truth from `ground-truth/*.txt`.
///
/// Image ids are 1-based positions of the sorted file stems and category ids
/// are 1-based positions in `class_names`. Records of other classes are
/// dropped.
///
/// # Errors
///
/// Returns `EmptyDataset` when the directory holds no ground-truth file.
pub fn convert_ground_truth(layout: &OutputLayout, class_names: &[String]) -> Result<CocoGroundTruth> {
    let gt_dir = layout.ground_truth_dir();
    let files = if gt_dir.is_dir() {
        list_record_files(&gt_dir)?
    } else {
        Vec::new()
    };
    if files.is_empty() {
        return Err(MapEvalError::EmptyDataset(format!(
            "no ground-truth files in {}",
            gt_dir.display()
        )));
    }

    let mut dataset = CocoGroundTruth {
        categories: class_names
            .iter()
            .enumerate()
            .map(|(idx, name)| CocoCategory {
                id: idx as u64 + 1,
                name: name.clone(),
                supercategory: name.clone(),
            })
            .collect(),
        ..Default::default()
    };

    for (idx, (stem, path)) in files.iter().enumerate() {
        let image_id = idx as u64 + 1;
        dataset.images.push(CocoImage {
            id: image_id,
            file_name: format!("{stem}.jpg"),
        });

        for record in read_ground_truth_file(path)? {
            let Some(category_id) = category_id(class_names, &record.class_name) else {
                continue;
            };
            dataset.annotations.push(CocoAnnotation {
                id: dataset.annotations.len() as u64 + 1,
                image_id,
                category_id,
                bbox: record.bbox.to_xywh(),
                area: record.bbox.area(),
                iscrowd: u8::from(record.difficult),
            });
        }
    }

    debug!(
        images = dataset.images.len(),
        annotations = dataset.annotations.len(),
        "converted ground truth"
    );
    Ok(dataset)
}

/// Build the COCO detection results from `detection-results/*.txt`.
///
/// Only files whose stem is a ground-truth image are read; a missing
/// directory yields no detections.
pub fn convert_detections(
    layout: &OutputLayout,
    class_names: &[String],
    image_index: &HashMap<String, u64>,
) -> Result<Vec<CocoDetection>> {
    let dr_dir = layout.detection_results_dir();
    if !dr_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut detections = Vec::new();
    let mut orphans = 0usize;
    for (stem, path) in list_record_files(&dr_dir)? {
        let Some(&image_id) = image_index.get(&stem) else {
            orphans += 1;
            continue;
        };

        for record in read_detection_file(&path)? {
            let Some(category_id) = category_id(class_names, &record.class_name) else {
                continue;
            };
            detections.push(CocoDetection {
                image_id,
                category_id,
                bbox: record.bbox.to_xywh(),
                score: record.confidence,
            });
        }
    }

    if orphans > 0 {
        warn!(orphans, "detection files without ground truth are ignored");
    }
    Ok(detections)
}

/// Write a value as pretty-printed JSON.
pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(File::create(path).map_err(|e| MapEvalError::io(path, e))?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn classes() -> Vec<String> {
        vec!["egg".to_string(), "chick".to_string()]
    }

    fn layout_with_records(gt: &[(&str, &str)], dr: &[(&str, &str)]) -> (TempDir, OutputLayout) {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.ensure_dirs().unwrap();
        for (id, content) in gt {
            fs::write(layout.ground_truth_file(id), content).unwrap();
        }
        for (id, content) in dr {
            fs::write(layout.detection_results_file(id), content).unwrap();
        }
        (dir, layout)
    }

    #[test]
    fn test_convert_ground_truth_ids_and_boxes() {
        let (_dir, layout) = layout_with_records(
            &[
                ("b", "chick 0 0 10 20 difficult\n"),
                ("a", "egg 10 20 50 80\ndog 1 1 2 2\n"),
            ],
            &[],
        );
        let gt = convert_ground_truth(&layout, &classes()).unwrap();

        assert_eq!(gt.images.len(), 2);
        assert_eq!(gt.images[0], CocoImage { id: 1, file_name: "a.jpg".into() });
        assert_eq!(gt.annotations.len(), 2);

        let egg = &gt.annotations[0];
        assert_eq!((egg.image_id, egg.category_id), (1, 1));
        assert_eq!(egg.bbox, [10.0, 20.0, 40.0, 60.0]);
        assert_eq!(egg.area, 2400.0);
        assert!(!egg.is_crowd());

        let chick = &gt.annotations[1];
        assert_eq!((chick.image_id, chick.category_id), (2, 2));
        assert!(chick.is_crowd());
    }

    #[test]
    fn test_convert_detections_uses_image_index() {
        let (_dir, layout) = layout_with_records(
            &[("a", "egg 10 20 50 80\n")],
            &[("a", "egg 0.9 10 20 50 80\ndog 0.5 1 1 2 2\n"), ("zzz", "egg 0.4 1 1 5 5\n")],
        );
        let gt = convert_ground_truth(&layout, &classes()).unwrap();
        let dets = convert_detections(&layout, &classes(), &gt.image_index()).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].image_id, 1);
        assert_eq!(dets[0].score, 0.9);
        assert_eq!(dets[0].area(), 2400.0);
    }

    #[test]
    fn test_no_ground_truth_is_empty_dataset() {
        let (_dir, layout) = layout_with_records(&[], &[]);
        assert!(matches!(
            convert_ground_truth(&layout, &classes()),
            Err(MapEvalError::EmptyDataset(_))
        ));
    }
}
