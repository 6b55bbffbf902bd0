//! Column role identification.
//!
//! Deterministic, case-insensitive substring matching over column names,
//! evaluated in fixed term-priority order; among columns matching the same
//! term, the earliest column wins. Substring matching is a known fragility
//! (a station-id column containing `q` would be picked up); the CLI column
//! overrides exist as the escape hatch for datasets that trip over it.

use tracing::{info, warn};

use crate::domain::{ColumnRoles, TabularFrame};
use crate::error::IdentifyError;

/// Date-column name fragments, highest priority first.
const DATE_TERMS: [&str; 4] = ["date", "time", "fecha", "dia"];

/// Value-column name fragments, highest priority first.
const VALUE_TERMS: [&str; 8] = [
    "q",
    "streamflow",
    "flow",
    "caudal",
    "discharge",
    "m3s",
    "m³/s",
    "valor",
];

/// Name fragments that mark a coordinate column in spatial exports.
const COORD_SUBSTRINGS: [&str; 4] = ["longitud", "latitud", "lon", "lat"];
/// Exact coordinate names. Single letters must not match as substrings or
/// they would disqualify nearly every name.
const COORD_EXACT: [&str; 2] = ["x", "y"];

/// Resolve the date and value columns, honoring caller overrides.
pub fn identify(
    frame: &TabularFrame,
    date_override: Option<&str>,
    value_override: Option<&str>,
) -> Result<ColumnRoles, IdentifyError> {
    let date_column = match date_override {
        Some(name) => Some(require_column(frame, name)?),
        None => find_date_column(frame),
    };

    let value_column = match value_override {
        Some(name) => require_column(frame, name)?,
        None => find_value_column(frame, date_column.as_deref())?,
    };

    info!(
        date = date_column.as_deref().unwrap_or("<none>"),
        value = %value_column,
        "columns identified"
    );
    Ok(ColumnRoles {
        date_column,
        value_column,
    })
}

/// Look up an override by name, returning the canonical column name.
fn require_column(frame: &TabularFrame, name: &str) -> Result<String, IdentifyError> {
    frame
        .column(name)
        .map(|c| c.name.clone())
        .ok_or_else(|| IdentifyError::ColumnNotFound {
            name: name.to_string(),
            columns: frame.column_names(),
        })
}

fn find_date_column(frame: &TabularFrame) -> Option<String> {
    for term in DATE_TERMS {
        for column in frame.columns() {
            if column.name.to_lowercase().contains(term) {
                return Some(column.name.clone());
            }
        }
    }
    None
}

fn find_value_column(
    frame: &TabularFrame,
    date_column: Option<&str>,
) -> Result<String, IdentifyError> {
    // Pass 1: name heuristics, never a coordinate-named column.
    for term in VALUE_TERMS {
        for column in frame.columns() {
            let lower = column.name.to_lowercase();
            if lower.contains(term) && !is_coordinate_name(&lower) {
                return Ok(column.name.clone());
            }
        }
    }

    let is_date = |name: &str| date_column.is_some_and(|d| d.eq_ignore_ascii_case(name));

    // Pass 2: first numeric column that is neither the date column nor
    // coordinate-named.
    for column in frame.columns() {
        if column.is_numeric()
            && !is_date(&column.name)
            && !is_coordinate_name(&column.name.to_lowercase())
        {
            info!(column = %column.name, "no name matched; using first numeric column");
            return Ok(column.name.clone());
        }
    }

    // Last resort: a coordinate-named numeric column, when nothing else is
    // numeric at all.
    for column in frame.columns() {
        if column.is_numeric() && !is_date(&column.name) {
            warn!(
                column = %column.name,
                "only a coordinate-named numeric column remains; using it"
            );
            return Ok(column.name.clone());
        }
    }

    Err(IdentifyError::NoValueColumn {
        columns: frame.column_names(),
    })
}

fn is_coordinate_name(lower: &str) -> bool {
    COORD_SUBSTRINGS.iter().any(|s| lower.contains(s))
        || COORD_EXACT.iter().any(|e| lower == *e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, ColumnValues};

    fn text_col(name: &str) -> Column {
        Column {
            name: name.into(),
            values: ColumnValues::Text(vec![Some("a".into())]),
        }
    }

    fn num_col(name: &str) -> Column {
        Column {
            name: name.into(),
            values: ColumnValues::Float(vec![Some(1.0)]),
        }
    }

    fn frame(columns: Vec<Column>) -> TabularFrame {
        TabularFrame::new(columns)
    }

    #[test]
    fn value_name_match_beats_column_position() {
        // "q" is the highest-priority term, so the later column wins.
        let f = frame(vec![num_col("total_flow"), num_col("q_station")]);
        let roles = identify(&f, None, None).unwrap();
        assert_eq!(roles.value_column, "q_station");
    }

    #[test]
    fn identification_is_case_insensitive() {
        let f = frame(vec![text_col("FECHA"), num_col("CAUDAL (M3S)")]);
        let roles = identify(&f, None, None).unwrap();
        assert_eq!(roles.date_column.as_deref(), Some("FECHA"));
        assert_eq!(roles.value_column, "CAUDAL (M3S)");
    }

    #[test]
    fn identification_is_invariant_under_column_permutation() {
        let a = frame(vec![text_col("fecha"), num_col("caudal"), num_col("valor")]);
        let b = frame(vec![num_col("valor"), num_col("caudal"), text_col("fecha")]);
        let roles_a = identify(&a, None, None).unwrap();
        let roles_b = identify(&b, None, None).unwrap();
        assert_eq!(roles_a.value_column, roles_b.value_column);
        assert_eq!(roles_a.date_column, roles_b.date_column);
    }

    #[test]
    fn coordinate_columns_are_never_matched_by_name() {
        let f = frame(vec![num_col("longitud"), num_col("latitud"), num_col("valor")]);
        let roles = identify(&f, None, None).unwrap();
        assert_eq!(roles.value_column, "valor");
    }

    #[test]
    fn numeric_fallback_skips_date_and_coordinates() {
        let f = frame(vec![
            text_col("fecha"),
            num_col("lat"),
            num_col("lon"),
            num_col("registro"),
        ]);
        let roles = identify(&f, None, None).unwrap();
        assert_eq!(roles.value_column, "registro");
    }

    #[test]
    fn coordinate_column_is_last_resort_when_only_numeric() {
        let f = frame(vec![text_col("estacion"), num_col("lat")]);
        let roles = identify(&f, None, None).unwrap();
        assert_eq!(roles.value_column, "lat");
    }

    #[test]
    fn missing_date_column_is_not_an_error() {
        let f = frame(vec![num_col("caudal")]);
        let roles = identify(&f, None, None).unwrap();
        assert!(roles.date_column.is_none());
    }

    #[test]
    fn date_terms_follow_priority_order() {
        // "fecha" outranks "dia" regardless of position.
        let f = frame(vec![text_col("dia"), text_col("fecha"), num_col("caudal")]);
        let roles = identify(&f, None, None).unwrap();
        assert_eq!(roles.date_column.as_deref(), Some("fecha"));
    }

    #[test]
    fn no_candidate_reports_available_columns() {
        let f = frame(vec![text_col("estacion"), text_col("observador")]);
        let err = identify(&f, None, None).unwrap_err();
        match err {
            IdentifyError::NoValueColumn { columns } => {
                assert_eq!(columns, vec!["estacion".to_string(), "observador".to_string()]);
            }
            other => panic!("expected NoValueColumn, got {other:?}"),
        }
    }

    #[test]
    fn overrides_win_and_report_misses() {
        let f = frame(vec![text_col("fecha"), num_col("medicion")]);
        let roles = identify(&f, Some("fecha"), Some("MEDICION")).unwrap();
        // Canonical (frame) spelling is returned, not the override spelling.
        assert_eq!(roles.value_column, "medicion");

        let err = identify(&f, None, Some("nope")).unwrap_err();
        assert!(matches!(err, IdentifyError::ColumnNotFound { .. }));
    }
}
