use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expected left-to-right labels per shelf, top shelf first.
///
/// Row `i` is compared with detected shelf `i + 1`. Cells that were not JSON strings are kept
/// as `None` so they still count as expected positions but can never match.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Planogram {
    pub rows: Vec<Vec<Option<String>>>,
}

impl Planogram {
    pub fn from_rows<R, L>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|label| Some(label.into())).collect())
                .collect(),
        }
    }

    /// Reads the `{"planogram": [[label, ...], ...]}` document shape.
    ///
    /// Returns `None` when the document has no usable `planogram` list. Rows that are not
    /// lists are treated as empty rows.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let rows = value.as_object()?.get("planogram")?.as_array()?;
        let rows = rows
            .iter()
            .map(|row| {
                row.as_array()
                    .map(|cells| {
                        cells
                            .iter()
                            .map(|cell| cell.as_str().map(str::to_owned))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();
        Some(Self { rows })
    }
}

/// How well one photo matches its planogram.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ComplianceResult {
    pub match_score: f64,
    /// `match_score * 100`, rounded to two decimals.
    pub match_percent: f64,
    pub total_expected: usize,
    pub total_matched: usize,
}
