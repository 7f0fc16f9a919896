//! Confidence score thresholding utilities.

use crate::error::{MapEvalError, Result};
use crate::types::DetectionBox;

/// Filter raw detections by confidence score threshold.
///
/// # Arguments
///
/// * `detections` - Detector output to filter
/// * `threshold` - Minimum confidence score (0.0 to 1.0)
///
/// # Returns
///
/// Returns a new vector containing only detections with score >= threshold.
///
/// # Errors
///
/// Returns an error if the threshold is not in the valid range [0.0, 1.0].
///
/// # Example
///
/// ```
/// use voc_map_eval::threshold::filter_by_confidence;
/// use voc_map_eval::types::{BoundingBox, DetectionBox};
///
/// let detections = vec![
///     DetectionBox::new("egg", 0.9, BoundingBox::new(10.0, 20.0, 40.0, 60.0)),
///     DetectionBox::new("egg", 0.0005, BoundingBox::new(50.0, 60.0, 120.0, 140.0)),
/// ];
///
/// let filtered = filter_by_confidence(&detections, 0.001).unwrap();
/// assert_eq!(filtered.len(), 1);
/// ```
pub fn filter_by_confidence(detections: &[DetectionBox], threshold: f64) -> Result<Vec<DetectionBox>> {
    validate_threshold(threshold)?;

    Ok(detections
        .iter()
        .filter(|det| det.score >= threshold)
        .cloned()
        .collect())
}

/// Validate that a threshold is in the valid range [0.0, 1.0].
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(MapEvalError::InvalidThreshold(
            format!("Threshold must be between 0.0 and 1.0, got {}", threshold)
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    #[test]
    fn test_filter_by_confidence() {
        let detections = vec![
            DetectionBox::new("egg", 0.9, BoundingBox::new(10.0, 20.0, 40.0, 60.0)),
            DetectionBox::new("egg", 0.3, BoundingBox::new(50.0, 60.0, 120.0, 140.0)),
        ];

        let filtered = filter_by_confidence(&detections, 0.5).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].score, 0.9);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let detections = vec![DetectionBox::new("egg", 0.5, BoundingBox::new(0.0, 0.0, 1.0, 1.0))];
        assert_eq!(filter_by_confidence(&detections, 0.5).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_threshold() {
        let detections = vec![];
        assert!(filter_by_confidence(&detections, 1.5).is_err());
        assert!(filter_by_confidence(&detections, -0.1).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }
}
