use common_types::{ComplianceResult, Planogram, ShelfSummary};

/// Compares detected shelf rows with the planogram, position by position.
///
/// Planogram row `i` is paired with shelf `i + 1`; unpaired rows on either side are ignored.
/// Returns `None` when there is no planogram, no shelf, or no expected position at all.
#[must_use]
pub fn score_compliance(summary: &ShelfSummary, planogram: Option<&Planogram>) -> Option<ComplianceResult> {
    let planogram = planogram?;
    if summary.shelves.is_empty() {
        return None;
    }

    let mut total_expected = 0;
    let mut total_matched = 0;
    for (expected, shelf) in planogram.rows.iter().zip(&summary.shelves) {
        total_expected += expected.len();
        total_matched += expected
            .iter()
            .zip(&shelf.classes_left_to_right)
            .filter(|(want, got)| want.as_deref() == Some(got.as_str()))
            .count();
    }

    if total_expected == 0 {
        return None;
    }
    let match_score = total_matched as f64 / total_expected as f64;
    Some(ComplianceResult {
        match_score,
        match_percent: round2(match_score * 100.0),
        total_expected,
        total_matched,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
