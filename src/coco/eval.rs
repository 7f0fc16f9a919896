//! COCO bbox evaluation: evaluate, accumulate and summarize.
//!
//! Follows the pycocotools protocol. Each (category, area range, image)
//! triple is matched independently at every IoU threshold, then detections
//! are pooled over images per (category, area range, max detections) to
//! build interpolated precision and final recall.

use crate::coco::convert::{CocoAnnotation, CocoDetection, CocoGroundTruth};
use crate::coco::params::{AreaRange, CocoParams};
use crate::metrics::iou::{calculate_crowd_iou, calculate_iou};
use crate::metrics::precision_recall::{cumulative_curve, interpolate_precision};
use crate::types::{BoundingBox, CocoSummary, MatchOutcome};
use std::collections::HashMap;

/// Matching result of one (category, area range, image) triple.
#[derive(Debug, Clone)]
struct EvalImage {
    /// Scores of the ranked detections, capped at the largest max_det
    dt_scores: Vec<f64>,
    /// `dt_matched[t][d]`: detection `d` matched a ground truth at threshold `t`
    dt_matched: Vec<Vec<bool>>,
    /// `dt_ignore[t][d]`: detection `d` does not count at threshold `t`
    dt_ignore: Vec<Vec<bool>>,
    gt_ignore: Vec<bool>,
}

/// Precision `[T x R x K x A x M]` and recall `[T x K x A x M]`, `-1` where a
/// category has no counted ground truth.
#[derive(Debug, Clone)]
pub struct AccumulatedEval {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub t: usize,
    pub r: usize,
    pub k: usize,
    pub a: usize,
    pub m: usize,
}

impl AccumulatedEval {
    pub fn precision_idx(&self, t: usize, r: usize, k: usize, a: usize, m: usize) -> usize {
        ((((t * self.r + r) * self.k + k) * self.a + a) * self.m) + m
    }

    pub fn recall_idx(&self, t: usize, k: usize, a: usize, m: usize) -> usize {
        (((t * self.k + k) * self.a + a) * self.m) + m
    }
}

/// One line of the 12-number summary.
struct SummaryRow {
    ap: bool,
    iou_threshold: Option<f64>,
    area: &'static str,
    max_det: usize,
}

const SUMMARY_ROWS: [SummaryRow; 12] = [
    SummaryRow { ap: true, iou_threshold: None, area: "all", max_det: 100 },
    SummaryRow { ap: true, iou_threshold: Some(0.5), area: "all", max_det: 100 },
    SummaryRow { ap: true, iou_threshold: Some(0.75), area: "all", max_det: 100 },
    SummaryRow { ap: true, iou_threshold: None, area: "small", max_det: 100 },
    SummaryRow { ap: true, iou_threshold: None, area: "medium", max_det: 100 },
    SummaryRow { ap: true, iou_threshold: None, area: "large", max_det: 100 },
    SummaryRow { ap: false, iou_threshold: None, area: "all", max_det: 1 },
    SummaryRow { ap: false, iou_threshold: None, area: "all", max_det: 10 },
    SummaryRow { ap: false, iou_threshold: None, area: "all", max_det: 100 },
    SummaryRow { ap: false, iou_threshold: None, area: "small", max_det: 100 },
    SummaryRow { ap: false, iou_threshold: None, area: "medium", max_det: 100 },
    SummaryRow { ap: false, iou_threshold: None, area: "large", max_det: 100 },
];

/// COCO bbox evaluator over a ground-truth dataset and detection results.
pub struct CocoEvaluator<'a> {
    pub params: CocoParams,
    image_ids: Vec<u64>,
    category_ids: Vec<u64>,
    gts: HashMap<(u64, u64), Vec<&'a CocoAnnotation>>,
    dts: HashMap<(u64, u64), Vec<&'a CocoDetection>>,
    eval_images: Vec<Option<EvalImage>>,
    pub eval: Option<AccumulatedEval>,
}

impl<'a> CocoEvaluator<'a> {
    pub fn new(ground_truth: &'a CocoGroundTruth, detections: &'a [CocoDetection]) -> Self {
        Self::with_params(ground_truth, detections, CocoParams::default())
    }

    pub fn with_params(
        ground_truth: &'a CocoGroundTruth,
        detections: &'a [CocoDetection],
        params: CocoParams,
    ) -> Self {
        let mut image_ids: Vec<u64> = ground_truth.images.iter().map(|i| i.id).collect();
        image_ids.sort_unstable();
        let mut category_ids: Vec<u64> = ground_truth.categories.iter().map(|c| c.id).collect();
        category_ids.sort_unstable();

        let mut gts: HashMap<(u64, u64), Vec<&CocoAnnotation>> = HashMap::new();
        for ann in &ground_truth.annotations {
            gts.entry((ann.image_id, ann.category_id)).or_default().push(ann);
        }
        let mut dts: HashMap<(u64, u64), Vec<&CocoDetection>> = HashMap::new();
        for det in detections {
            dts.entry((det.image_id, det.category_id)).or_default().push(det);
        }

        CocoEvaluator {
            params,
            image_ids,
            category_ids,
            gts,
            dts,
            eval_images: Vec::new(),
            eval: None,
        }
    }

    /// Run per-image matching for every category and area range.
    pub fn evaluate(&mut self) {
        let max_det = self.params.max_det();
        let mut eval_images =
            Vec::with_capacity(self.category_ids.len() * self.params.area_ranges.len() * self.image_ids.len());

        for &category_id in &self.category_ids {
            for area in &self.params.area_ranges {
                for &image_id in &self.image_ids {
                    eval_images.push(self.evaluate_image(image_id, category_id, area, max_det));
                }
            }
        }

        self.eval_images = eval_images;
    }

    fn evaluate_image(
        &self,
        image_id: u64,
        category_id: u64,
        area: &AreaRange,
        max_det: usize,
    ) -> Option<EvalImage> {
        let empty_gt = Vec::new();
        let empty_dt = Vec::new();
        let gts = self.gts.get(&(image_id, category_id)).unwrap_or(&empty_gt);
        let dts = self.dts.get(&(image_id, category_id)).unwrap_or(&empty_dt);
        if gts.is_empty() && dts.is_empty() {
            return None;
        }

        // Non-ignored ground truth first; stable so file order breaks ties
        let mut gts: Vec<(&CocoAnnotation, bool)> = gts
            .iter()
            .map(|&g| (g, g.is_crowd() || !area.contains(g.area)))
            .collect();
        gts.sort_by_key(|&(_, ignore)| ignore);

        let mut dts: Vec<&CocoDetection> = dts.clone();
        dts.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        dts.truncate(max_det);

        let ious: Vec<Vec<f64>> = dts
            .iter()
            .map(|d| {
                let dt_box = xywh_box(&d.bbox);
                gts.iter()
                    .map(|(g, _)| {
                        let gt_box = xywh_box(&g.bbox);
                        if g.is_crowd() {
                            calculate_crowd_iou(&dt_box, &gt_box)
                        } else {
                            calculate_iou(&dt_box, &gt_box)
                        }
                    })
                    .collect()
            })
            .collect();

        let num_thresholds = self.params.iou_thresholds.len();
        let mut dt_matched = vec![vec![false; dts.len()]; num_thresholds];
        let mut dt_ignore = vec![vec![false; dts.len()]; num_thresholds];

        for (t, &threshold) in self.params.iou_thresholds.iter().enumerate() {
            let mut gt_matched = vec![false; gts.len()];
            for (d, det) in dts.iter().enumerate() {
                let mut best_iou = threshold.min(1.0 - 1e-10);
                let mut best: Option<usize> = None;

                for (g, (gt, ignore)) in gts.iter().enumerate() {
                    if gt_matched[g] && !gt.is_crowd() {
                        continue;
                    }
                    // Ignored ground truth is sorted last
                    if let Some(m) = best {
                        if !gts[m].1 && *ignore {
                            break;
                        }
                    }
                    if ious[d][g] < best_iou {
                        continue;
                    }
                    best_iou = ious[d][g];
                    best = Some(g);
                }

                match best {
                    Some(g) => {
                        gt_matched[g] = true;
                        dt_matched[t][d] = true;
                        dt_ignore[t][d] = gts[g].1;
                    }
                    None => dt_ignore[t][d] = !area.contains(det.area()),
                }
            }
        }

        Some(EvalImage {
            dt_scores: dts.iter().map(|d| d.score).collect(),
            dt_matched,
            dt_ignore,
            gt_ignore: gts.iter().map(|&(_, ignore)| ignore).collect(),
        })
    }

    /// Pool per-image results into precision and recall arrays.
    ///
    /// Runs [`evaluate`](Self::evaluate) first if it has not been called.
    pub fn accumulate(&mut self) {
        let t = self.params.iou_thresholds.len();
        let r = self.params.recall_thresholds.len();
        let k = self.category_ids.len();
        let a = self.params.area_ranges.len();
        let m = self.params.max_dets.len();
        let num_images = self.image_ids.len();

        if self.eval_images.len() != k * a * num_images {
            self.evaluate();
        }

        let mut eval = AccumulatedEval {
            precision: vec![-1.0; t * r * k * a * m],
            recall: vec![-1.0; t * k * a * m],
            t,
            r,
            k,
            a,
            m,
        };

        for k_idx in 0..k {
            for a_idx in 0..a {
                let base = (k_idx * a + a_idx) * num_images;
                let images: Vec<&EvalImage> = self.eval_images[base..base + num_images]
                    .iter()
                    .flatten()
                    .collect();

                let num_positives: usize = images
                    .iter()
                    .map(|e| e.gt_ignore.iter().filter(|&&ignore| !ignore).count())
                    .sum();
                if num_positives == 0 {
                    continue;
                }

                for (m_idx, &max_det) in self.params.max_dets.iter().enumerate() {
                    // (score, image, detection) pooled over images
                    let mut pooled: Vec<(f64, &EvalImage, usize)> = Vec::new();
                    for e in &images {
                        let nd = e.dt_scores.len().min(max_det);
                        pooled.extend((0..nd).map(|d| (e.dt_scores[d], *e, d)));
                    }
                    pooled.sort_by(|x, y| y.0.partial_cmp(&x.0).unwrap_or(std::cmp::Ordering::Equal));

                    for t_idx in 0..t {
                        let outcomes: Vec<MatchOutcome> = pooled
                            .iter()
                            .map(|&(_, e, d)| {
                                if e.dt_ignore[t_idx][d] {
                                    MatchOutcome::Ignored
                                } else if e.dt_matched[t_idx][d] {
                                    MatchOutcome::TruePositive
                                } else {
                                    MatchOutcome::FalsePositive
                                }
                            })
                            .collect();
                        let curve = cumulative_curve(&outcomes, num_positives);

                        let recall_idx = eval.recall_idx(t_idx, k_idx, a_idx, m_idx);
                        eval.recall[recall_idx] = curve.recalls.last().copied().unwrap_or(0.0);

                        let interpolated = interpolate_precision(
                            &curve.precisions,
                            &curve.recalls,
                            &self.params.recall_thresholds,
                        );
                        for (r_idx, value) in interpolated.into_iter().enumerate() {
                            let p_idx = eval.precision_idx(t_idx, r_idx, k_idx, a_idx, m_idx);
                            eval.precision[p_idx] = value;
                        }
                    }
                }
            }
        }

        self.eval = Some(eval);
    }

    /// Compute the 12-number summary. Requires [`accumulate`](Self::accumulate).
    pub fn summarize(&self) -> Option<CocoSummary> {
        let eval = self.eval.as_ref()?;
        let mut stats = [-1.0; 12];
        for (stat, row) in stats.iter_mut().zip(SUMMARY_ROWS.iter()) {
            *stat = self.summarize_row(eval, row);
        }
        Some(CocoSummary { stats })
    }

    fn summarize_row(&self, eval: &AccumulatedEval, row: &SummaryRow) -> f64 {
        let (Some(a_idx), Some(m_idx)) = (
            self.params.area_index(row.area),
            self.params.max_det_index(row.max_det),
        ) else {
            return -1.0;
        };
        let t_indices: Vec<usize> = match row.iou_threshold {
            Some(threshold) => self.params.iou_index(threshold).into_iter().collect(),
            None => (0..eval.t).collect(),
        };

        let mut values = Vec::new();
        for &t_idx in &t_indices {
            for k_idx in 0..eval.k {
                if row.ap {
                    for r_idx in 0..eval.r {
                        values.push(eval.precision[eval.precision_idx(t_idx, r_idx, k_idx, a_idx, m_idx)]);
                    }
                } else {
                    values.push(eval.recall[eval.recall_idx(t_idx, k_idx, a_idx, m_idx)]);
                }
            }
        }

        let counted: Vec<f64> = values.into_iter().filter(|&v| v > -1.0).collect();
        if counted.is_empty() {
            -1.0
        } else {
            counted.iter().sum::<f64>() / counted.len() as f64
        }
    }
}

fn xywh_box(bbox: &[f64; 4]) -> BoundingBox {
    BoundingBox::from_xywh(bbox[0], bbox[1], bbox[2], bbox[3])
}

/// Render the summary in the standard pycocotools layout.
pub fn format_summary(summary: &CocoSummary) -> String {
    SUMMARY_ROWS
        .iter()
        .zip(summary.stats.iter())
        .map(|(row, value)| {
            let (title, kind) = if row.ap {
                ("Average Precision", "(AP)")
            } else {
                ("Average Recall", "(AR)")
            };
            let iou = match row.iou_threshold {
                Some(threshold) => format!("{threshold:.2}"),
                None => "0.50:0.95".to_string(),
            };
            format!(
                " {:<18} {} @[ IoU={:<9} | area={:>6} | maxDets={:>3} ] = {:.3}\n",
                title, kind, iou, row.area, row.max_det, value
            )
        })
        .collect()
}
