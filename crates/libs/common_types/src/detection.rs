use serde::{Deserialize, Serialize};

/// Label reported for an object the classifier declined to name.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// One detection on a shelf photo.
///
/// Produced by the detector, labelled by the crop classifier, then placed on a shelf by the
/// clusterer (`shelf_index`, `index_in_shelf`, both 1-based).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DetectedObject {
    /// Detector class name.
    pub label: String,
    pub class_id: i64,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in pixels, clamped to the image.
    pub bbox: [u32; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_rel: Option<String>,
    /// Classifier label for the crop, `None` when it declined to predict.
    #[serde(default)]
    pub pred_label: Option<String>,
    #[serde(default)]
    pub pred_confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelf_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_in_shelf: Option<usize>,
}

impl DetectedObject {
    #[must_use]
    pub fn new(label: impl Into<String>, class_id: i64, confidence: f32, bbox: [u32; 4]) -> Self {
        Self {
            label: label.into(),
            class_id,
            confidence,
            bbox,
            crop: None,
            crop_rel: None,
            pred_label: None,
            pred_confidence: 0.0,
            shelf_index: None,
            index_in_shelf: None,
        }
    }

    #[must_use]
    pub fn x_center(&self) -> f64 {
        let [x1, _, x2, _] = self.bbox;
        (f64::from(x1) + f64::from(x2)) / 2.0
    }

    #[must_use]
    pub fn y_center(&self) -> f64 {
        let [_, y1, _, y2] = self.bbox;
        (f64::from(y1) + f64::from(y2)) / 2.0
    }

    /// Box height, never below one pixel.
    #[must_use]
    pub fn height(&self) -> f64 {
        let [_, y1, _, y2] = self.bbox;
        f64::from(y2.saturating_sub(y1).max(1))
    }

    /// The classified label as it appears in a shelf sequence.
    #[must_use]
    pub fn shelf_label(&self) -> &str {
        match self.pred_label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => UNKNOWN_LABEL,
        }
    }

    /// Whether the classifier produced a usable label.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.pred_label
            .as_deref()
            .is_some_and(|label| !label.is_empty() && !label.eq_ignore_ascii_case(UNKNOWN_LABEL))
    }
}

/// A label predicted for a single crop.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}
