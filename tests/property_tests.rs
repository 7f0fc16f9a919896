//! Property-based tests using proptest
//!
//! These tests verify invariants of the matching and metric code that should
//! hold for any boxes, scores and match sequences.

use proptest::prelude::*;
use std::collections::HashMap;
use voc_map_eval::matching::{count_positives, match_detections, ClassDetection};
use voc_map_eval::metrics::ap::calculate_voc_ap;
use voc_map_eval::metrics::f1_score::operating_point;
use voc_map_eval::metrics::iou::{calculate_iou, calculate_voc_iou};
use voc_map_eval::metrics::miss_rate::log_average_miss_rate;
use voc_map_eval::metrics::precision_recall::cumulative_curve;
use voc_map_eval::nms::{non_maximum_suppression, Detection};
use voc_map_eval::types::{BoundingBox, GroundTruthRecord, MatchOutcome};

fn bbox_strategy() -> impl Strategy<Value = BoundingBox> {
    (0.0..200.0f64, 0.0..200.0f64, 1.0..80.0f64, 1.0..80.0f64)
        .prop_map(|(x, y, w, h)| BoundingBox::from_xywh(x, y, w, h))
}

fn outcome_strategy() -> impl Strategy<Value = MatchOutcome> {
    prop_oneof![
        Just(MatchOutcome::TruePositive),
        Just(MatchOutcome::FalsePositive),
        Just(MatchOutcome::Ignored),
    ]
}

fn true_positives(outcomes: &[MatchOutcome]) -> usize {
    outcomes
        .iter()
        .filter(|&&o| o == MatchOutcome::TruePositive)
        .count()
}

proptest! {
    #[test]
    fn prop_iou_range_and_symmetry(a in bbox_strategy(), b in bbox_strategy()) {
        let iou = calculate_iou(&a, &b);
        prop_assert!((0.0..=1.0).contains(&iou), "IoU out of range: {}", iou);
        prop_assert!((iou - calculate_iou(&b, &a)).abs() < 1e-12);
    }

    #[test]
    fn prop_voc_iou_range(a in bbox_strategy(), b in bbox_strategy()) {
        if let Some(iou) = calculate_voc_iou(&a, &b) {
            prop_assert!(iou > 0.0 && iou <= 1.0 + 1e-12, "VOC IoU out of range: {}", iou);
        }
        prop_assert_eq!(calculate_voc_iou(&a, &a), Some(1.0));
    }

    #[test]
    fn prop_voc_ap_range(
        outcomes in prop::collection::vec(outcome_strategy(), 0..60),
        missed in 0usize..10,
    ) {
        let num_gt = true_positives(&outcomes) + missed;
        let curve = cumulative_curve(&outcomes, num_gt);
        let ap = calculate_voc_ap(&curve.recalls, &curve.precisions);
        prop_assert!((0.0..=1.0 + 1e-12).contains(&ap), "AP out of range: {}", ap);
    }

    #[test]
    fn prop_curve_is_monotone(
        outcomes in prop::collection::vec(outcome_strategy(), 1..60),
        missed in 0usize..10,
    ) {
        let num_gt = true_positives(&outcomes) + missed;
        let curve = cumulative_curve(&outcomes, num_gt);
        prop_assert_eq!(curve.len(), outcomes.len());
        for pair in curve.recalls.windows(2) {
            prop_assert!(pair[1] >= pair[0]);
        }
        for pair in curve.false_positives.windows(2) {
            prop_assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn prop_lamr_range(
        outcomes in prop::collection::vec(outcome_strategy(), 0..60),
        missed in 0usize..10,
        num_images in 1usize..20,
    ) {
        let num_gt = true_positives(&outcomes) + missed;
        let curve = cumulative_curve(&outcomes, num_gt);
        let lamr = log_average_miss_rate(&curve.recalls, &curve.false_positives, num_images);
        prop_assert!((0.0..=1.0 + 1e-12).contains(&lamr), "LAMR out of range: {}", lamr);
    }

    #[test]
    fn prop_operating_point_range(
        outcomes in prop::collection::vec(outcome_strategy(), 1..40),
        threshold in 0.0..=1.0f64,
    ) {
        let num_gt = true_positives(&outcomes).max(1);
        let curve = cumulative_curve(&outcomes, num_gt);
        let scores: Vec<f64> = (0..outcomes.len())
            .map(|i| 1.0 - i as f64 / outcomes.len() as f64)
            .collect();

        let point = operating_point(&scores, &curve, num_gt, threshold);
        prop_assert!((0.0..=1.0).contains(&point.recall));
        prop_assert!((0.0..=1.0).contains(&point.precision));
        prop_assert!((0.0..=1.0).contains(&point.f1));
        prop_assert!(point.f1 <= point.precision.max(point.recall) + 1e-12);
    }

    #[test]
    fn prop_ground_truth_matched_at_most_once(
        gt_boxes in prop::collection::vec((bbox_strategy(), any::<bool>()), 0..8),
        det_boxes in prop::collection::vec((bbox_strategy(), 0.0..1.0f64), 0..20),
        min_overlap in 0.1..0.9f64,
    ) {
        let records: Vec<GroundTruthRecord> = gt_boxes
            .iter()
            .map(|&(bbox, difficult)| GroundTruthRecord {
                class_name: "egg".to_string(),
                bbox,
                difficult,
            })
            .collect();
        let mut ground_truth = HashMap::new();
        ground_truth.insert("img".to_string(), records);

        let detections: Vec<ClassDetection> = det_boxes
            .iter()
            .map(|&(bbox, confidence)| ClassDetection {
                image_id: "img".to_string(),
                confidence,
                bbox,
            })
            .collect();

        let matches = match_detections(&detections, &ground_truth, min_overlap);
        prop_assert_eq!(matches.len(), detections.len());

        let outcomes: Vec<MatchOutcome> = matches.iter().map(|m| m.outcome).collect();
        prop_assert!(true_positives(&outcomes) <= count_positives(&ground_truth));

        for pair in matches.windows(2) {
            prop_assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn prop_nms_keeps_top_scorer(
        boxes in prop::collection::vec((bbox_strategy(), 0.0..1.0f64), 1..20),
        iou_threshold in 0.0..=1.0f64,
    ) {
        let detections: Vec<Detection> = boxes
            .iter()
            .enumerate()
            .map(|(index, &(bbox, score))| Detection { bbox, score, index })
            .collect();

        let keep = non_maximum_suppression(&detections, iou_threshold).unwrap();
        prop_assert_eq!(keep.len(), detections.len());

        let top = detections
            .iter()
            .enumerate()
            .fold(0, |best, (i, det)| if det.score > detections[best].score { i } else { best });
        prop_assert!(keep[top]);

        // Kept boxes never overlap above the threshold
        for i in 0..detections.len() {
            for j in (i + 1)..detections.len() {
                if keep[i] && keep[j] {
                    prop_assert!(calculate_iou(&detections[i].bbox, &detections[j].bbox) <= iou_threshold);
                }
            }
        }
    }
}
