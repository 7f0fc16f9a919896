//! Loading of the manifest, the class list and the generated record files.

use crate::error::{MapEvalError, Result};
use crate::types::{BoundingBox, DetectionRecord, GroundTruthRecord};
use std::fs;
use std::path::{Path, PathBuf};

/// Token appended to ground-truth lines of difficult objects.
pub const DIFFICULT_TOKEN: &str = "difficult";

/// Load image identifiers from a whitespace-separated manifest.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
///
/// # Example
///
/// ```no_run
/// use voc_map_eval::loader::load_image_ids;
///
/// let ids = load_image_ids("VOCdevkit/VOC2007/ImageSets/Main/test.txt").unwrap();
/// println!("Evaluating {} images", ids.len());
/// ```
pub fn load_image_ids<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = read_text(path.as_ref())?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}

/// Load the ordered class list, one name per line.
///
/// Surrounding whitespace is trimmed and blank lines are ignored.
///
/// # Errors
///
/// Returns an error if the file cannot be read or lists no class.
pub fn load_class_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = read_text(path)?;
    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        return Err(MapEvalError::EmptyDataset(format!(
            "class list {} contains no class names",
            path.display()
        )));
    }
    Ok(names)
}

fn parse_coordinate(token: &str, path: &Path, line: usize) -> Result<f64> {
    token.parse::<f64>().map_err(|_| {
        MapEvalError::invalid_record(path, line, format!("'{token}' is not a number"))
    })
}

fn parse_bbox(tokens: &[&str], path: &Path, line: usize) -> Result<BoundingBox> {
    Ok(BoundingBox::new(
        parse_coordinate(tokens[0], path, line)?,
        parse_coordinate(tokens[1], path, line)?,
        parse_coordinate(tokens[2], path, line)?,
        parse_coordinate(tokens[3], path, line)?,
    ))
}

/// Parse one `<class> <xmin> <ymin> <xmax> <ymax>[ difficult]` line.
///
/// Class names may contain spaces; numeric fields are taken from the right.
/// `path` and `line` are only used for error reporting.
pub fn parse_ground_truth_line(text: &str, path: &Path, line: usize) -> Result<GroundTruthRecord> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let difficult = tokens.last() == Some(&DIFFICULT_TOKEN);
    let fields = if difficult { &tokens[..tokens.len() - 1] } else { &tokens[..] };

    if fields.len() < 5 {
        return Err(MapEvalError::invalid_record(
            path,
            line,
            format!("expected '<class> <xmin> <ymin> <xmax> <ymax>', got '{text}'"),
        ));
    }

    let split = fields.len() - 4;
    Ok(GroundTruthRecord {
        class_name: fields[..split].join(" "),
        bbox: parse_bbox(&fields[split..], path, line)?,
        difficult,
    })
}

/// Parse one `<class> <score> <left> <top> <right> <bottom>` line.
pub fn parse_detection_line(text: &str, path: &Path, line: usize) -> Result<DetectionRecord> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(MapEvalError::invalid_record(
            path,
            line,
            format!("expected '<class> <score> <left> <top> <right> <bottom>', got '{text}'"),
        ));
    }

    let split = tokens.len() - 5;
    Ok(DetectionRecord {
        class_name: tokens[..split].join(" "),
        confidence: parse_coordinate(tokens[split], path, line)?,
        bbox: parse_bbox(&tokens[split + 1..], path, line)?,
    })
}

/// Read a whole text file, naming the file on failure.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| MapEvalError::io(path, e))
}

fn read_records<T>(
    path: &Path,
    parse: impl Fn(&str, &Path, usize) -> Result<T>,
) -> Result<Vec<T>> {
    let content = read_text(path)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(idx, text)| parse(text, path, idx + 1))
        .collect()
}

/// Read every record of a `ground-truth/<id>.txt` file.
pub fn read_ground_truth_file<P: AsRef<Path>>(path: P) -> Result<Vec<GroundTruthRecord>> {
    read_records(path.as_ref(), parse_ground_truth_line)
}

/// Read every record of a `detection-results/<id>.txt` file.
pub fn read_detection_file<P: AsRef<Path>>(path: P) -> Result<Vec<DetectionRecord>> {
    read_records(path.as_ref(), parse_detection_line)
}

/// List the `*.txt` files of a record directory as `(image_id, path)` pairs,
/// sorted by image id.
pub fn list_record_files<P: AsRef<Path>>(dir: P) -> Result<Vec<(String, PathBuf)>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| MapEvalError::io(dir, e))? {
        let path = entry.map_err(|e| MapEvalError::io(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> &'static Path {
        Path::new("test.txt")
    }

    #[test]
    fn test_parse_ground_truth_line() {
        let record = parse_ground_truth_line("egg 10 20 50 80", p(), 1).unwrap();
        assert_eq!(record.class_name, "egg");
        assert_eq!(record.bbox, BoundingBox::new(10.0, 20.0, 50.0, 80.0));
        assert!(!record.difficult);
    }

    #[test]
    fn test_parse_difficult_ground_truth_line() {
        let record = parse_ground_truth_line("egg 10 20 50 80 difficult", p(), 1).unwrap();
        assert!(record.difficult);
        assert_eq!(record.bbox.xmax, 50.0);
    }

    #[test]
    fn test_class_names_with_spaces() {
        let record = parse_ground_truth_line("potted plant 1 2 3 4 difficult", p(), 1).unwrap();
        assert_eq!(record.class_name, "potted plant");
        assert!(record.difficult);

        let det = parse_detection_line("potted plant 0.91 1 2 3 4", p(), 1).unwrap();
        assert_eq!(det.class_name, "potted plant");
        assert!((det.confidence - 0.91).abs() < 1e-12);
    }

    #[test]
    fn test_parse_detection_line() {
        let det = parse_detection_line("egg 0.8734 11 21 49 79", p(), 3).unwrap();
        assert_eq!(det.class_name, "egg");
        assert_eq!(det.bbox, BoundingBox::new(11.0, 21.0, 49.0, 79.0));
    }

    #[test]
    fn test_short_lines_are_rejected() {
        let err = parse_ground_truth_line("egg 10 20 50", p(), 7).unwrap_err();
        assert!(matches!(err, MapEvalError::InvalidRecord { line: 7, .. }));

        let err = parse_detection_line("egg 10 20 50 80", p(), 2).unwrap_err();
        assert!(matches!(err, MapEvalError::InvalidRecord { line: 2, .. }));
    }

    #[test]
    fn test_non_numeric_coordinate() {
        let err = parse_ground_truth_line("egg 10 twenty 50 80", p(), 1).unwrap_err();
        assert!(err.to_string().contains("twenty"));
    }
}
