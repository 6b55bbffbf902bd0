//! Missing-value repair on the value column.
//!
//! Interior gaps (a valid value on both sides) are linearly interpolated by
//! row position; a leading run of gaps takes the first valid value, a
//! trailing run the last. Rows that still have no value afterwards (only
//! possible when the column holds no valid value at all) are dropped. Row
//! order is preserved throughout.

use tracing::{info, warn};

use crate::domain::{ColumnRoles, ColumnValues, TabularFrame};

/// What the cleaner did, for reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanSummary {
    pub rows_in: usize,
    pub missing: usize,
    pub missing_fraction: f64,
    pub interpolated: usize,
    pub edge_filled: usize,
    pub rows_dropped: usize,
}

/// Repair the value column in place. Never fails; degrades to dropping rows.
pub fn clean(frame: &mut TabularFrame, roles: &ColumnRoles) -> CleanSummary {
    let rows_in = frame.n_rows();

    let mut values: Vec<Option<f64>> = {
        let Some(column) = frame.column(&roles.value_column) else {
            // identify() guarantees the column exists; nothing to do if not.
            return CleanSummary {
                rows_in,
                ..CleanSummary::default()
            };
        };
        match &column.values {
            ColumnValues::Float(v) => v.clone(),
            // An override can name a text column; entries that do not parse
            // as numbers count as missing.
            ColumnValues::Text(v) => v
                .iter()
                .map(|s| {
                    s.as_deref()
                        .and_then(|t| t.trim().parse::<f64>().ok())
                        .filter(|f| f.is_finite())
                })
                .collect(),
            ColumnValues::Date(_) => vec![None; rows_in],
        }
    };

    let missing = values.iter().filter(|v| v.is_none()).count();
    let missing_fraction = if rows_in == 0 {
        0.0
    } else {
        missing as f64 / rows_in as f64
    };
    info!(
        rows = rows_in,
        missing,
        fraction = %format!("{:.2}%", missing_fraction * 100.0),
        "value column census"
    );

    let (interpolated, edge_filled) = if missing > 0 {
        repair_gaps(&mut values)
    } else {
        (0, 0)
    };

    if let Some(column) = frame.column_mut(&roles.value_column) {
        column.values = ColumnValues::Float(values.clone());
    }

    let keep: Vec<bool> = values.iter().map(Option::is_some).collect();
    let rows_dropped = keep.iter().filter(|k| !**k).count();
    if rows_dropped > 0 {
        warn!(rows_dropped, "dropping rows with unrecoverable values");
        frame.retain_rows(&keep);
    }

    CleanSummary {
        rows_in,
        missing,
        missing_fraction,
        interpolated,
        edge_filled,
        rows_dropped,
    }
}

/// Fill gaps between/around valid anchors. Returns (interpolated, edge-filled).
fn repair_gaps(values: &mut [Option<f64>]) -> (usize, usize) {
    let anchors: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    let (Some(&(first_idx, first_val)), Some(&(last_idx, last_val))) =
        (anchors.first(), anchors.last())
    else {
        // No valid value anywhere; nothing can be repaired.
        return (0, 0);
    };

    let mut interpolated = 0usize;
    let mut edge_filled = 0usize;

    for v in values.iter_mut().take(first_idx) {
        *v = Some(first_val);
        edge_filled += 1;
    }
    for v in values.iter_mut().skip(last_idx + 1) {
        *v = Some(last_val);
        edge_filled += 1;
    }

    for pair in anchors.windows(2) {
        let (a, va) = pair[0];
        let (b, vb) = pair[1];
        if b > a + 1 {
            let span = (b - a) as f64;
            for i in (a + 1)..b {
                let t = (i - a) as f64 / span;
                values[i] = Some(va + (vb - va) * t);
                interpolated += 1;
            }
        }
    }

    (interpolated, edge_filled)
}

/// The cleaned value column as plain floats. Call after [`clean`].
pub fn cleaned_values(frame: &TabularFrame, roles: &ColumnRoles) -> Vec<f64> {
    match frame.column(&roles.value_column).map(|c| &c.values) {
        Some(ColumnValues::Float(v)) => v.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Column;

    fn value_frame(values: Vec<Option<f64>>) -> (TabularFrame, ColumnRoles) {
        let frame = TabularFrame::new(vec![Column {
            name: "caudal".into(),
            values: ColumnValues::Float(values),
        }]);
        let roles = ColumnRoles {
            date_column: None,
            value_column: "caudal".into(),
        };
        (frame, roles)
    }

    #[test]
    fn interior_gaps_interpolate_without_dropping_rows() {
        let (mut frame, roles) = value_frame(vec![Some(10.0), None, None, Some(16.0), Some(2.0)]);
        let summary = clean(&mut frame, &roles);
        assert_eq!(frame.n_rows(), 5);
        assert_eq!(summary.rows_dropped, 0);
        assert_eq!(summary.missing, 2);
        assert_eq!(summary.interpolated, 2);
        assert_eq!(
            cleaned_values(&frame, &roles),
            vec![10.0, 12.0, 14.0, 16.0, 2.0]
        );
    }

    #[test]
    fn leading_and_trailing_gaps_take_nearest_valid_value() {
        let (mut frame, roles) = value_frame(vec![None, Some(5.0), Some(7.0), None, None]);
        let summary = clean(&mut frame, &roles);
        assert_eq!(summary.edge_filled, 3);
        assert_eq!(
            cleaned_values(&frame, &roles),
            vec![5.0, 5.0, 7.0, 7.0, 7.0]
        );
    }

    #[test]
    fn mixed_gaps_match_reference_fixture() {
        let (mut frame, roles) = value_frame(vec![None, Some(12.5), None, Some(14.0)]);
        let summary = clean(&mut frame, &roles);
        assert_eq!(summary.rows_dropped, 0);
        assert_eq!(
            cleaned_values(&frame, &roles),
            vec![12.5, 12.5, 13.25, 14.0]
        );
    }

    #[test]
    fn fully_missing_column_drops_every_row() {
        let (mut frame, roles) = value_frame(vec![None, None, None]);
        let summary = clean(&mut frame, &roles);
        assert_eq!(frame.n_rows(), 0);
        assert_eq!(summary.rows_dropped, 3);
        assert!((summary.missing_fraction - 1.0).abs() < 1e-12);
    }

    #[test]
    fn complete_column_is_untouched() {
        let (mut frame, roles) = value_frame(vec![Some(1.0), Some(2.0)]);
        let summary = clean(&mut frame, &roles);
        assert_eq!(summary.missing, 0);
        assert_eq!(summary.interpolated, 0);
        assert_eq!(cleaned_values(&frame, &roles), vec![1.0, 2.0]);
    }

    #[test]
    fn text_value_column_parses_and_drops_non_numeric_rows() {
        let mut frame = TabularFrame::new(vec![Column {
            name: "valor".into(),
            values: ColumnValues::Text(vec![
                Some("1.5".into()),
                Some("s/d".into()),
                Some("2.5".into()),
            ]),
        }]);
        let roles = ColumnRoles {
            date_column: None,
            value_column: "valor".into(),
        };
        let summary = clean(&mut frame, &roles);
        // "s/d" is missing, repaired by interpolation; nothing dropped.
        assert_eq!(summary.rows_dropped, 0);
        assert_eq!(cleaned_values(&frame, &roles), vec![1.5, 2.0, 2.5]);
    }

    #[test]
    fn row_order_is_preserved_when_rows_drop() {
        let mut frame = TabularFrame::new(vec![
            Column {
                name: "etiqueta".into(),
                values: ColumnValues::Text(vec![
                    Some("a".into()),
                    Some("b".into()),
                    Some("c".into()),
                ]),
            },
            Column {
                name: "caudal".into(),
                values: ColumnValues::Date(vec![None, None, None]),
            },
        ]);
        let roles = ColumnRoles {
            date_column: None,
            value_column: "caudal".into(),
        };
        clean(&mut frame, &roles);
        assert_eq!(frame.n_rows(), 0);
        // The sibling column shrank with it.
        assert_eq!(frame.column("etiqueta").unwrap().values.len(), 0);
    }
}
