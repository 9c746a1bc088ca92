use app_state::ShelfSettings;
use common_types::{DetectedObject, ShelfRow, ShelfSummary};
use std::collections::BTreeMap;
use tracing::debug;

/// Vertical distance between consecutive centers above which a new shelf starts.
///
/// Uses the upper median of `heights` so the threshold follows the dominant object scale.
#[must_use]
pub fn gap_threshold(heights: &[f64], settings: &ShelfSettings) -> f64 {
    let mut sorted = heights.to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = sorted.get(sorted.len() / 2).copied().unwrap_or(0.0);
    f64::from(settings.gap_min_px).max(median * f64::from(settings.gap_ratio))
}

/// Groups one photo's detections into shelf rows.
///
/// Writes `shelf_index` and `index_in_shelf` onto every object in `objects` and returns the
/// per-row summary. Every object ends up in exactly one row.
pub fn cluster_shelves(objects: &mut [DetectedObject], settings: &ShelfSettings) -> ShelfSummary {
    if objects.is_empty() {
        return ShelfSummary::default();
    }

    let heights: Vec<f64> = objects.iter().map(DetectedObject::height).collect();
    let threshold = gap_threshold(&heights, settings);

    // Stable, so equal centers keep their input order.
    let mut by_y: Vec<usize> = (0..objects.len()).collect();
    by_y.sort_by(|&a, &b| objects[a].y_center().total_cmp(&objects[b].y_center()));

    let mut shelves: Vec<Vec<usize>> = Vec::new();
    let mut last_y: Option<f64> = None;
    for idx in by_y {
        let y = objects[idx].y_center();
        match (shelves.last_mut(), last_y) {
            (Some(current), Some(prev)) if y - prev <= threshold => current.push(idx),
            _ => shelves.push(vec![idx]),
        }
        last_y = Some(y);
    }
    debug!(
        "Clustered {} objects into {} shelves (gap threshold {threshold:.1}px)",
        objects.len(),
        shelves.len()
    );

    let mut summary = ShelfSummary::default();
    for (position, mut members) in shelves.into_iter().enumerate() {
        let shelf_index = position + 1;
        let y_center_min = members.first().map_or(0.0, |&i| objects[i].y_center());
        let y_center_max = members.last().map_or(0.0, |&i| objects[i].y_center());

        members.sort_by(|&a, &b| objects[a].x_center().total_cmp(&objects[b].x_center()));
        for (slot, &idx) in members.iter().enumerate() {
            objects[idx].shelf_index = Some(shelf_index);
            objects[idx].index_in_shelf = Some(slot + 1);
        }

        let row = summarize_row(shelf_index, y_center_min, y_center_max, members.iter().map(|&i| &objects[i]));
        summary.total_known += row.known_count;
        summary.total_unknown += row.unknown_count;
        summary.total_objects += row.total_objects;
        summary.shelves.push(row);
    }

    summary
}

/// Builds a row from its members in left-to-right order.
fn summarize_row<'a>(
    shelf_index: usize,
    y_center_min: f64,
    y_center_max: f64,
    members: impl Iterator<Item = &'a DetectedObject>,
) -> ShelfRow {
    let mut row = ShelfRow {
        shelf_index,
        y_center_min,
        y_center_max,
        total_objects: 0,
        known_count: 0,
        unknown_count: 0,
        class_counts: BTreeMap::new(),
        classes_left_to_right: Vec::new(),
    };

    for object in members {
        row.total_objects += 1;
        row.classes_left_to_right.push(object.shelf_label().to_owned());
        if object.is_known() {
            row.known_count += 1;
            *row.class_counts.entry(object.shelf_label().to_owned()).or_default() += 1;
        } else {
            row.unknown_count += 1;
        }
    }

    row
}
