//! Ground-truth extraction: VOC XML annotations to `ground-truth/<id>.txt`.

use crate::annotation::{load_annotation, VocAnnotation, VocObject};
use crate::config::EvalConfig;
use crate::error::{MapEvalError, Result};
use crate::loader::DIFFICULT_TOKEN;
use crate::stats::{ExtractionStats, Progress};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Format one ground-truth record line (without the trailing newline).
///
/// Coordinates are copied verbatim from the annotation.
pub fn format_ground_truth_line(object: &VocObject, difficult: bool) -> String {
    let [xmin, ymin, xmax, ymax] = object.coordinates();
    let mut line = format!("{} {} {} {} {}", object.class_name(), xmin, ymin, xmax, ymax);
    if difficult {
        line.push(' ');
        line.push_str(DIFFICULT_TOKEN);
    }
    line
}

/// Render the ground-truth file content for one annotation.
///
/// Objects whose class is not in `class_names` are skipped.
///
/// # Errors
///
/// Returns `InvalidAnnotation` if an object carries a non-integer
/// `difficult` value.
///
/// # Example
///
/// ```
/// use voc_map_eval::annotation::parse_annotation;
/// use voc_map_eval::ground_truth::render_ground_truth;
/// use voc_map_eval::stats::ExtractionStats;
///
/// let xml = "<annotation><object><name>egg</name><difficult>1</difficult><bndbox>\
///            <xmin>10</xmin><ymin>20</ymin><xmax>50</xmax><ymax>80</ymax>\
///            </bndbox></object></annotation>";
/// let annotation = parse_annotation(xml).unwrap();
/// let mut stats = ExtractionStats::new();
/// let content = render_ground_truth(&annotation, &["egg".to_string()], &mut stats).unwrap();
/// assert_eq!(content, "egg 10 20 50 80 difficult\n");
/// ```
pub fn render_ground_truth(
    annotation: &VocAnnotation,
    class_names: &[String],
    stats: &mut ExtractionStats,
) -> Result<String> {
    let mut content = String::new();
    let mut written = 0;

    for object in &annotation.objects {
        let difficult = object.is_difficult()?;
        if !class_names.iter().any(|name| name == object.class_name()) {
            stats.skip_unknown_class();
            continue;
        }

        content.push_str(&format_ground_truth_line(object, difficult));
        content.push('\n');
        stats.add_record(difficult);
        written += 1;
    }

    stats.finish_image(written);
    Ok(content)
}

/// Convert one annotation file into its ground-truth record file.
pub fn write_ground_truth_file(
    annotation_path: &Path,
    output_path: &Path,
    class_names: &[String],
    stats: &mut ExtractionStats,
) -> Result<()> {
    let annotation = load_annotation(annotation_path)?;
    let content = render_ground_truth(&annotation, class_names, stats)?;
    fs::write(output_path, content).map_err(|e| MapEvalError::io(output_path, e))?;
    debug!(path = %output_path.display(), "wrote ground truth");
    Ok(())
}

/// Write `ground-truth/<id>.txt` for every image identifier.
///
/// The output directory must already exist. Any unreadable or malformed
/// annotation aborts the extraction.
pub fn extract_ground_truth(
    config: &EvalConfig,
    image_ids: &[String],
    class_names: &[String],
) -> Result<ExtractionStats> {
    info!(images = image_ids.len(), "Get ground truth result.");

    let output = config.output();
    let mut stats = ExtractionStats::new();
    let progress = Progress::new("ground-truth", image_ids.len(), config.progress_every);

    for (idx, image_id) in image_ids.iter().enumerate() {
        write_ground_truth_file(
            &config.annotation_path(image_id),
            &output.ground_truth_file(image_id),
            class_names,
            &mut stats,
        )?;
        progress.tick(idx + 1);
    }

    stats.log_summary("ground-truth");
    info!("Get ground truth result done.");
    Ok(stats)
}
