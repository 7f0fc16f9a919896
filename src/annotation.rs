//! Pascal VOC XML annotation parsing.
//!
//! Only the elements the evaluation needs are modelled; everything else in
//! the file (`size`, `source`, `pose`, `part`, ...) is ignored.
//!
//! ```xml
//! <annotation>
//!   <object>
//!     <name>egg</name>
//!     <difficult>0</difficult>
//!     <bndbox>
//!       <xmin>10</xmin><ymin>20</ymin><xmax>50</xmax><ymax>80</ymax>
//!     </bndbox>
//!   </object>
//! </annotation>
//! ```

use crate::error::{MapEvalError, Result};
use crate::loader::read_text;
use serde::Deserialize;
use std::path::Path;

/// A parsed `<annotation>` document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VocAnnotation {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(rename = "object", default)]
    pub objects: Vec<VocObject>,
}

/// One `<object>` element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VocObject {
    pub name: String,
    /// Raw text of `<difficult>`, absent when the tag is missing
    #[serde(default)]
    pub difficult: Option<String>,
    pub bndbox: VocBndBox,
}

/// `<bndbox>` coordinates, kept as the annotation's own text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VocBndBox {
    pub xmin: String,
    pub ymin: String,
    pub xmax: String,
    pub ymax: String,
}

impl VocObject {
    /// Class name with surrounding whitespace removed.
    pub fn class_name(&self) -> &str {
        self.name.trim()
    }

    /// Whether the object is marked difficult (`<difficult>1</difficult>`).
    ///
    /// A missing tag means not difficult.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAnnotation` if the tag is present but not an integer.
    pub fn is_difficult(&self) -> Result<bool> {
        match &self.difficult {
            None => Ok(false),
            Some(text) => {
                let value = text.trim().parse::<i64>().map_err(|_| {
                    MapEvalError::InvalidAnnotation(format!(
                        "object '{}' has non-integer difficult value '{}'",
                        self.class_name(),
                        text
                    ))
                })?;
                Ok(value == 1)
            }
        }
    }

    /// Coordinates as `[xmin, ymin, xmax, ymax]` text.
    pub fn coordinates(&self) -> [&str; 4] {
        [
            self.bndbox.xmin.trim(),
            self.bndbox.ymin.trim(),
            self.bndbox.xmax.trim(),
            self.bndbox.ymax.trim(),
        ]
    }
}

/// Parse a VOC annotation from an XML string.
///
/// # Example
///
/// ```
/// use voc_map_eval::annotation::parse_annotation;
///
/// let xml = "<annotation><object><name>egg</name><bndbox>\
///            <xmin>10</xmin><ymin>20</ymin><xmax>50</xmax><ymax>80</ymax>\
///            </bndbox></object></annotation>";
/// let annotation = parse_annotation(xml).unwrap();
/// assert_eq!(annotation.objects.len(), 1);
/// assert_eq!(annotation.objects[0].coordinates(), ["10", "20", "50", "80"]);
/// ```
pub fn parse_annotation(xml: &str) -> Result<VocAnnotation> {
    Ok(quick_xml::de::from_str(xml)?)
}

/// Load and parse a VOC annotation file.
pub fn load_annotation<P: AsRef<Path>>(path: P) -> Result<VocAnnotation> {
    let xml = read_text(path.as_ref())?;
    parse_annotation(&xml)
}
