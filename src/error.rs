//! Error types for the voc-map-eval library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for voc-map-eval operations.
pub type Result<T> = std::result::Result<T, MapEvalError>;

/// Error types that can occur while preparing records or computing mAP.
#[derive(Error, Debug)]
pub enum MapEvalError {
    /// Error reading or writing a file or directory.
    #[error("IO error on {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during JSON parsing or serialization.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Malformed Pascal VOC XML.
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::de::DeError),

    /// Image could not be opened, decoded or encoded.
    #[error("Image error on {path}: {source}")]
    ImageError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Invalid annotation data.
    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    /// A ground-truth or detection-record line could not be parsed.
    #[error("Invalid record in {path}:{line}: {reason}")]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Missing required field or setting.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Empty dataset provided.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Invalid confidence or IoU threshold.
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    /// Mode value outside 0..=4.
    #[error("Invalid map mode: {0} (expected 0-4)")]
    InvalidMode(u8),

    /// A ground-truth file has no detection-results counterpart.
    #[error("Missing detection results for image '{0}'")]
    MissingDetections(String),

    /// The detector failed or is not configured.
    #[error("Detector error: {0}")]
    Detector(String),
}

impl MapEvalError {
    /// Build an `IoError` for the file or directory at `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MapEvalError::IoError {
            path: path.into(),
            source,
        }
    }

    /// Build an `ImageError` for the image at `path`.
    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        MapEvalError::ImageError {
            path: path.into(),
            source,
        }
    }

    /// Build an `InvalidRecord` error for a 1-based line number.
    pub fn invalid_record(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        MapEvalError::InvalidRecord {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}
