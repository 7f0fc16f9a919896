//! Numeric kernels shared by the VOC and COCO evaluators.

pub mod iou;
pub mod ap;
pub mod precision_recall;
pub mod f1_score;
pub mod miss_rate;

pub use iou::{calculate_crowd_iou, calculate_iou, calculate_voc_iou};
pub use ap::{calculate_map, calculate_voc_ap};
pub use precision_recall::{calculate_precision_recall, cumulative_curve, CumulativeCurve, PrecisionRecall};
pub use f1_score::{calculate_f1_score, operating_point};
pub use miss_rate::log_average_miss_rate;
