//! Log-average miss rate (LAMR).
//!
//! Miss rate `1 - recall` is sampled against false positives per image
//! (FPPI) at nine points spaced evenly in log space between 1e-2 and 1, and
//! summarized by their geometric mean. Lower is better.

/// Number of FPPI reference points.
pub const FPPI_POINTS: usize = 9;

/// FPPI reference points, `logspace(-2, 0, 9)`.
pub fn fppi_reference_points() -> [f64; FPPI_POINTS] {
    let mut points = [0.0; FPPI_POINTS];
    for (i, point) in points.iter_mut().enumerate() {
        let exponent = -2.0 + 2.0 * i as f64 / (FPPI_POINTS - 1) as f64;
        *point = 10f64.powf(exponent);
    }
    points
}

/// Compute the log-average miss rate of one class.
///
/// # Arguments
///
/// * `recalls` - Cumulative recall per ranked detection
/// * `false_positives` - Cumulative false-positive count per ranked detection
/// * `num_images` - Number of evaluated images
///
/// Returns 0.0 when the class has no detections.
///
/// # Example
///
/// ```
/// use voc_map_eval::metrics::miss_rate::log_average_miss_rate;
///
/// // Every object found before the first false positive
/// let lamr = log_average_miss_rate(&[0.5, 1.0], &[0, 0], 10);
/// assert!(lamr < 1e-6);
/// ```
pub fn log_average_miss_rate(recalls: &[f64], false_positives: &[usize], num_images: usize) -> f64 {
    let n = recalls.len().min(false_positives.len());
    if n == 0 || num_images == 0 {
        return 0.0;
    }

    let mut fppi = Vec::with_capacity(n + 1);
    let mut miss_rate = Vec::with_capacity(n + 1);
    fppi.push(-1.0);
    miss_rate.push(1.0);
    for i in 0..n {
        fppi.push(false_positives[i] as f64 / num_images as f64);
        miss_rate.push(1.0 - recalls[i]);
    }

    let log_sum: f64 = fppi_reference_points()
        .iter()
        .map(|&reference| {
            // fppi is non-decreasing and starts at -1, so a match always exists
            let idx = fppi.iter().rposition(|&f| f <= reference).unwrap_or(0);
            miss_rate[idx].max(1e-10).ln()
        })
        .sum();

    (log_sum / FPPI_POINTS as f64).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_points() {
        let points = fppi_reference_points();
        assert!((points[0] - 0.01).abs() < 1e-12);
        assert!((points[4] - 0.1).abs() < 1e-12);
        assert!((points[8] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(log_average_miss_rate(&[], &[], 5), 0.0);
    }

    #[test]
    fn test_nothing_found_is_one() {
        let lamr = log_average_miss_rate(&[0.0, 0.0], &[1, 2], 1);
        assert!((lamr - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_half_found_without_false_positives() {
        let lamr = log_average_miss_rate(&[0.5], &[0], 4);
        assert!((lamr - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_false_positives_raise_miss_rate() {
        // One FP per image arrives before the only true positive
        let early = log_average_miss_rate(&[1.0, 1.0], &[0, 1], 1);
        let late = log_average_miss_rate(&[0.0, 1.0], &[1, 1], 1);
        assert!(late > early);
    }
}
