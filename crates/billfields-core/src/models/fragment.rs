//! OCR text fragments, the engine's only input.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ExtractionError;

/// Geometry of a fragment on the page.
///
/// The engine never inspects it; it is carried through so callers can
/// highlight where a field came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Region {
    /// Axis-aligned rectangle (x1, y1, x2, y2).
    Rect([f32; 4]),

    /// Polygon corners, usually a quadrilateral from the text detector.
    Polygon(Vec<[f32; 2]>),
}

impl Region {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        match self {
            Region::Rect([x1, y1, x2, y2]) => (*x1, *y1, *x2, *y2),
            Region::Polygon(points) => {
                let min_x = points.iter().map(|p| p[0]).fold(f32::INFINITY, f32::min);
                let max_x = points.iter().map(|p| p[0]).fold(f32::NEG_INFINITY, f32::max);
                let min_y = points.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min);
                let max_y = points.iter().map(|p| p[1]).fold(f32::NEG_INFINITY, f32::max);
                (min_x, min_y, max_x, max_y)
            }
        }
    }
}

/// One OCR-detected text region with its recognition confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,

    /// Where the text was found, if the OCR producer reported it.
    #[serde(default, alias = "bbox", skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            region: None,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }
}

/// Find the region of the first fragment whose text contains `needle`,
/// ignoring case.
pub fn locate<'a>(fragments: &'a [TextFragment], needle: &str) -> Option<&'a Region> {
    let needle = needle.to_lowercase();
    fragments
        .iter()
        .find(|f| f.text.to_lowercase().contains(&needle))
        .and_then(|f| f.region.as_ref())
}

/// Read fragments from an OCR dump: a JSON array of objects with `text`,
/// `confidence` and an optional `region` (or `bbox`).
///
/// Elements that are not usable fragments are skipped with a warning; only
/// a missing or non-array document is an error.
pub fn fragments_from_value(value: &Value) -> Result<Vec<TextFragment>, ExtractionError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => {
            return Err(ExtractionError::InvalidInput(
                "fragment sequence is null".to_string(),
            ))
        }
        _ => {
            return Err(ExtractionError::InvalidInput(
                "fragment sequence is not an array".to_string(),
            ))
        }
    };

    let mut fragments = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match fragment_from_value(item) {
            Ok(fragment) => fragments.push(fragment),
            Err(reason) => warn!("Skipping fragment {}: {}", index, reason),
        }
    }

    Ok(fragments)
}

fn fragment_from_value(item: &Value) -> Result<TextFragment, String> {
    let object = item.as_object().ok_or("not an object")?;
    let text = object
        .get("text")
        .and_then(Value::as_str)
        .ok_or("missing text")?;
    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or("missing confidence")?;

    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!("confidence {} outside [0, 1]", confidence));
    }

    let region = object
        .get("region")
        .or_else(|| object.get("bbox"))
        .and_then(|r| serde_json::from_value::<Region>(r.clone()).ok());

    Ok(TextFragment {
        text: text.to_string(),
        confidence: confidence as f32,
        region,
    })
}
