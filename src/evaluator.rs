//! Pascal VOC mAP evaluation over the generated record files.
//!
//! Reads `ground-truth/*.txt` and `detection-results/*.txt` under an output
//! root, matches detections class by class and writes `results/results.txt`.

use crate::config::OutputLayout;
use crate::error::{MapEvalError, Result};
use crate::loader::{list_record_files, read_detection_file, read_ground_truth_file};
use crate::matching::{count_positives, match_detections, ClassDetection};
use crate::metrics::ap::{calculate_map, calculate_voc_ap};
use crate::metrics::f1_score::operating_point;
use crate::metrics::miss_rate::log_average_miss_rate;
use crate::metrics::precision_recall::cumulative_curve;
use crate::threshold::validate_threshold;
use crate::types::{ClassMetrics, GroundTruthRecord, MatchOutcome, VocMetrics};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Ground truth of one class, keyed by image id.
pub type ClassGroundTruth = HashMap<String, Vec<GroundTruthRecord>>;

/// Records loaded from an output root, grouped by class.
#[derive(Debug, Clone, Default)]
pub struct VocDataset {
    /// Image ids with a ground-truth file, sorted
    pub image_ids: Vec<String>,
    /// Ground truth per class name
    pub ground_truth: BTreeMap<String, ClassGroundTruth>,
    /// Detections per class name, in file order
    pub detections: HashMap<String, Vec<ClassDetection>>,
}

impl VocDataset {
    /// Load every ground-truth file and its detection-record counterpart.
    ///
    /// # Errors
    ///
    /// * `EmptyDataset` if there is no ground-truth file
    /// * `MissingDetections` if a ground-truth file has no detection file
    /// * `InvalidRecord` for a malformed line in either file
    pub fn load(layout: &OutputLayout) -> Result<Self> {
        let gt_dir = layout.ground_truth_dir();
        let gt_files = if gt_dir.is_dir() {
            list_record_files(&gt_dir)?
        } else {
            Vec::new()
        };
        if gt_files.is_empty() {
            return Err(MapEvalError::EmptyDataset(format!(
                "no ground-truth files in {}",
                gt_dir.display()
            )));
        }

        let mut dataset = VocDataset::default();
        for (image_id, gt_path) in gt_files {
            let dr_path = layout.detection_results_file(&image_id);
            if !dr_path.is_file() {
                return Err(MapEvalError::MissingDetections(image_id));
            }

            for record in read_ground_truth_file(&gt_path)? {
                dataset
                    .ground_truth
                    .entry(record.class_name.clone())
                    .or_default()
                    .entry(image_id.clone())
                    .or_default()
                    .push(record);
            }

            for record in read_detection_file(&dr_path)? {
                dataset
                    .detections
                    .entry(record.class_name)
                    .or_default()
                    .push(ClassDetection {
                        image_id: image_id.clone(),
                        confidence: record.confidence,
                        bbox: record.bbox,
                    });
            }

            debug!(image_id = %image_id, "loaded records");
            dataset.image_ids.push(image_id);
        }

        let known: HashSet<&str> = dataset.image_ids.iter().map(String::as_str).collect();
        let orphans = list_record_files(layout.detection_results_dir())?
            .into_iter()
            .filter(|(id, _)| !known.contains(id.as_str()))
            .count();
        if orphans > 0 {
            warn!(orphans, "detection files without ground truth are ignored");
        }

        Ok(dataset)
    }

    /// Classes with at least one non-difficult object, sorted by name.
    pub fn evaluated_classes(&self) -> Vec<&str> {
        self.ground_truth
            .iter()
            .filter(|(_, by_image)| count_positives(by_image) > 0)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Compute VOC metrics for a loaded dataset.
pub fn evaluate_voc(
    dataset: &VocDataset,
    min_overlap: f64,
    compute_recall_precision: bool,
    score_threshold: f64,
) -> Result<VocMetrics> {
    validate_threshold(min_overlap)?;
    validate_threshold(score_threshold)?;

    let empty = Vec::new();
    let mut class_metrics = Vec::new();

    for class_name in dataset.evaluated_classes() {
        let ground_truth = &dataset.ground_truth[class_name];
        let detections = dataset.detections.get(class_name).unwrap_or(&empty);
        let num_ground_truth = count_positives(ground_truth);

        let matches = match_detections(detections, ground_truth, min_overlap);
        let outcomes: Vec<MatchOutcome> = matches.iter().map(|m| m.outcome).collect();
        let scores: Vec<f64> = matches.iter().map(|m| m.confidence).collect();
        let curve = cumulative_curve(&outcomes, num_ground_truth);

        let ap = calculate_voc_ap(&curve.recalls, &curve.precisions);

        // Images holding at least one non-difficult object of the class
        let images_with_class = ground_truth
            .values()
            .filter(|records| records.iter().any(|r| !r.difficult))
            .count();
        let lamr = log_average_miss_rate(&curve.recalls, &curve.false_positives, images_with_class);

        let operating_point = compute_recall_precision
            .then(|| operating_point(&scores, &curve, num_ground_truth, score_threshold));

        debug!(class = class_name, ap, lamr, "evaluated class");
        class_metrics.push(ClassMetrics {
            class_name: class_name.to_string(),
            ap,
            lamr,
            num_ground_truth,
            num_detections: detections.len(),
            true_positives: curve.total_true_positives(),
            false_positives: curve.total_false_positives(),
            operating_point,
        });
    }

    let aps: Vec<f64> = class_metrics.iter().map(|m| m.ap).collect();
    Ok(VocMetrics {
        map: calculate_map(&aps),
        min_overlap,
        num_images: dataset.image_ids.len(),
        class_metrics,
    })
}

/// Render the plain-text report written to `results/results.txt`.
pub fn format_report(metrics: &VocMetrics) -> String {
    let mut out = String::from("# AP and precision/recall per class\n");
    for m in &metrics.class_metrics {
        out.push_str(&format!("{:.2}% = {} AP", m.ap * 100.0, m.class_name));
        if let Some(point) = &m.operating_point {
            out.push_str(&format!(
                " \t||\tscore_threshold={} : F1={:.2} ; Recall={:.2}% ; Precision={:.2}%",
                point.score_threshold,
                point.f1,
                point.recall * 100.0,
                point.precision * 100.0
            ));
        }
        out.push('\n');
    }

    out.push_str("\n# mAP of all classes\n");
    out.push_str(&format!("mAP = {:.2}%\n", metrics.map * 100.0));

    out.push_str("\n# Log-average miss rate per class\n");
    for m in &metrics.class_metrics {
        out.push_str(&format!("{}: lamr = {:.2}\n", m.class_name, m.lamr));
    }

    out.push_str("\n# Number of ground-truth objects per class\n");
    for m in &metrics.class_metrics {
        out.push_str(&format!("{}: {}\n", m.class_name, m.num_ground_truth));
    }

    out.push_str("\n# Number of detected objects per class\n");
    for m in &metrics.class_metrics {
        out.push_str(&format!(
            "{}: {} (tp:{}, fp:{})\n",
            m.class_name, m.num_detections, m.true_positives, m.false_positives
        ));
    }

    out
}

/// Compute VOC mAP from the record files under `path`.
///
/// Prints the report and writes it to `<path>/results/results.txt`.
///
/// # Arguments
///
/// * `min_overlap` - IoU needed for a true positive
/// * `compute_recall_precision` - Also report recall/precision/F1 at `score_threshold`
/// * `score_threshold` - Confidence of the reported operating point
/// * `path` - Output root holding `ground-truth/` and `detection-results/`
pub fn get_map<P: AsRef<Path>>(
    min_overlap: f64,
    compute_recall_precision: bool,
    score_threshold: f64,
    path: P,
) -> Result<VocMetrics> {
    validate_threshold(min_overlap)?;
    validate_threshold(score_threshold)?;
    let layout = OutputLayout::new(path);
    info!(min_overlap, "Get map.");

    let dataset = VocDataset::load(&layout)?;
    let metrics = evaluate_voc(&dataset, min_overlap, compute_recall_precision, score_threshold)?;

    let report = format_report(&metrics);
    let results_dir = layout.results_dir();
    fs::create_dir_all(&results_dir).map_err(|e| MapEvalError::io(&results_dir, e))?;
    let results_path = results_dir.join("results.txt");
    fs::write(&results_path, &report).map_err(|e| MapEvalError::io(&results_path, e))?;
    print!("{report}");

    info!(
        map = metrics.map,
        classes = metrics.class_metrics.len(),
        images = metrics.num_images,
        "Get map done."
    );
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, OperatingPoint};

    fn gt(class_name: &str, bbox: BoundingBox, difficult: bool) -> GroundTruthRecord {
        GroundTruthRecord {
            class_name: class_name.to_string(),
            bbox,
            difficult,
        }
    }

    fn det(image_id: &str, confidence: f64, bbox: BoundingBox) -> ClassDetection {
        ClassDetection {
            image_id: image_id.to_string(),
            confidence,
            bbox,
        }
    }

    fn dataset() -> VocDataset {
        let a = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
        let b = BoundingBox::new(100.0, 100.0, 150.0, 150.0);
        let mut data = VocDataset {
            image_ids: vec!["img1".into(), "img2".into()],
            ..Default::default()
        };
        data.ground_truth.insert(
            "egg".into(),
            HashMap::from([
                ("img1".to_string(), vec![gt("egg", a, false)]),
                ("img2".to_string(), vec![gt("egg", b, false)]),
            ]),
        );
        data.ground_truth.insert(
            "chick".into(),
            HashMap::from([("img1".to_string(), vec![gt("chick", b, true)])]),
        );
        data.detections.insert(
            "egg".into(),
            vec![det("img1", 0.9, a), det("img2", 0.3, b)],
        );
        data
    }

    #[test]
    fn test_only_non_difficult_classes_are_evaluated() {
        let data = dataset();
        assert_eq!(data.evaluated_classes(), vec!["egg"]);
    }

    #[test]
    fn test_perfect_detections() {
        let metrics = evaluate_voc(&dataset(), 0.5, true, 0.5).unwrap();
        assert_eq!(metrics.class_metrics.len(), 1);
        assert!((metrics.map - 1.0).abs() < 1e-10);

        let egg = metrics.class("egg").unwrap();
        assert_eq!(egg.true_positives, 2);
        assert_eq!(egg.false_positives, 0);
        // Only the 0.9 detection passes the 0.5 cut
        assert_eq!(
            egg.operating_point,
            Some(OperatingPoint {
                score_threshold: 0.5,
                recall: 0.5,
                precision: 1.0,
                f1: 2.0 / 3.0,
            })
        );
    }

    #[test]
    fn test_operating_point_omitted_when_disabled() {
        let metrics = evaluate_voc(&dataset(), 0.5, false, 0.5).unwrap();
        assert!(metrics.class("egg").unwrap().operating_point.is_none());
    }

    #[test]
    fn test_class_without_detections_has_zero_ap() {
        let mut data = dataset();
        data.detections.clear();
        let metrics = evaluate_voc(&data, 0.5, true, 0.5).unwrap();
        assert_eq!(metrics.map, 0.0);
    }

    #[test]
    fn test_invalid_min_overlap() {
        assert!(evaluate_voc(&dataset(), 1.5, true, 0.5).is_err());
    }

    #[test]
    fn test_report_layout() {
        let metrics = evaluate_voc(&dataset(), 0.5, true, 0.5).unwrap();
        let report = format_report(&metrics);
        assert!(report.contains("100.00% = egg AP"));
        assert!(report.contains("mAP = 100.00%"));
        assert!(report.contains("egg: 2 (tp:2, fp:0)"));
    }

    #[test]
    fn test_report_exact_text() {
        let metrics = VocMetrics {
            map: 0.625,
            min_overlap: 0.5,
            num_images: 3,
            class_metrics: vec![
                ClassMetrics {
                    class_name: "chick".to_string(),
                    ap: 0.5,
                    lamr: 0.25,
                    num_ground_truth: 4,
                    num_detections: 3,
                    true_positives: 2,
                    false_positives: 1,
                    operating_point: Some(OperatingPoint {
                        score_threshold: 0.5,
                        recall: 0.5,
                        precision: 1.0,
                        f1: 2.0 / 3.0,
                    }),
                },
                ClassMetrics {
                    class_name: "egg".to_string(),
                    ap: 0.75,
                    lamr: 0.0,
                    num_ground_truth: 2,
                    num_detections: 0,
                    true_positives: 0,
                    false_positives: 0,
                    operating_point: None,
                },
            ],
        };

        let expected = "# AP and precision/recall per class\n\
            50.00% = chick AP \t||\tscore_threshold=0.5 : F1=0.67 ; Recall=50.00% ; Precision=100.00%\n\
            75.00% = egg AP\n\
            \n# mAP of all classes\n\
            mAP = 62.50%\n\
            \n# Log-average miss rate per class\n\
            chick: lamr = 0.25\n\
            egg: lamr = 0.00\n\
            \n# Number of ground-truth objects per class\n\
            chick: 4\n\
            egg: 2\n\
            \n# Number of detected objects per class\n\
            chick: 3 (tp:2, fp:1)\n\
            egg: 0 (tp:0, fp:0)\n";
        assert_eq!(format_report(&metrics), expected);
    }
}
