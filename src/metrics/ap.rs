//! Average Precision (AP) and mean Average Precision (mAP) calculation.

/// Calculate VOC Average Precision with all-point interpolation.
///
/// The curve is padded with recall sentinels 0 and 1 (precision 0 at both
/// ends), precision is replaced by its monotone upper envelope, and the
/// area is summed over every point where recall changes.
///
/// # Arguments
///
/// * `recalls` - Cumulative recall per ranked detection (non-decreasing)
/// * `precisions` - Cumulative precision per ranked detection
///
/// # Example
///
/// ```
/// use voc_map_eval::metrics::ap::calculate_voc_ap;
///
/// // TP, FP, TP against two ground-truth objects
/// let recalls = vec![0.5, 0.5, 1.0];
/// let precisions = vec![1.0, 0.5, 2.0 / 3.0];
/// let ap = calculate_voc_ap(&recalls, &precisions);
/// assert!((ap - (0.5 + 0.5 * 2.0 / 3.0)).abs() < 1e-10);
/// ```
pub fn calculate_voc_ap(recalls: &[f64], precisions: &[f64]) -> f64 {
    let n = recalls.len().min(precisions.len());

    let mut mrec = Vec::with_capacity(n + 2);
    mrec.push(0.0);
    mrec.extend_from_slice(&recalls[..n]);
    mrec.push(1.0);

    let mut mpre = Vec::with_capacity(n + 2);
    mpre.push(0.0);
    mpre.extend_from_slice(&precisions[..n]);
    mpre.push(0.0);

    for i in (0..mpre.len() - 1).rev() {
        mpre[i] = mpre[i].max(mpre[i + 1]);
    }

    (1..mrec.len())
        .filter(|&i| mrec[i] != mrec[i - 1])
        .map(|i| (mrec[i] - mrec[i - 1]) * mpre[i])
        .sum()
}

/// Calculate mean Average Precision (mAP) across multiple classes.
///
/// # Example
///
/// ```
/// use voc_map_eval::metrics::ap::calculate_map;
///
/// let class_aps = vec![0.8, 0.9, 0.75, 0.85];
/// let map = calculate_map(&class_aps);
/// assert!((map - 0.825).abs() < 1e-10);
/// ```
pub fn calculate_map(class_aps: &[f64]) -> f64 {
    if class_aps.is_empty() {
        return 0.0;
    }

    class_aps.iter().sum::<f64>() / class_aps.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voc_ap_empty() {
        assert_eq!(calculate_voc_ap(&[], &[]), 0.0);
    }

    #[test]
    fn test_voc_ap_perfect() {
        let recalls = vec![0.25, 0.5, 0.75, 1.0];
        let precisions = vec![1.0; 4];
        assert!((calculate_voc_ap(&recalls, &precisions) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_voc_ap_partial_recall() {
        // Only half of the objects are ever found, always correctly
        let recalls = vec![0.25, 0.5];
        let precisions = vec![1.0, 1.0];
        assert!((calculate_voc_ap(&recalls, &precisions) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_voc_ap_uses_precision_envelope() {
        // FP first, then TP: the envelope lifts the first step to 0.5
        let recalls = vec![0.0, 1.0];
        let precisions = vec![0.0, 0.5];
        assert!((calculate_voc_ap(&recalls, &precisions) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_calculate_map_empty() {
        assert_eq!(calculate_map(&[]), 0.0);
    }
}
