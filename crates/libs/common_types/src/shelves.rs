use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One inferred shelf row of a photo, top to bottom.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ShelfRow {
    pub shelf_index: usize,
    pub y_center_min: f64,
    pub y_center_max: f64,
    pub total_objects: usize,
    pub known_count: usize,
    pub unknown_count: usize,
    /// Counts per classified label, known objects only.
    pub class_counts: BTreeMap<String, usize>,
    /// Classified labels from left to right, `UNKNOWN` where unclassified.
    pub classes_left_to_right: Vec<String>,
}

/// Shelf rows of one photo plus totals over all rows.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ShelfSummary {
    pub shelves: Vec<ShelfRow>,
    pub total_known: usize,
    pub total_unknown: usize,
    pub total_objects: usize,
}
