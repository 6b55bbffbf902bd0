//! Timestamp materialization and windowing.
//!
//! The date column, when present, is parsed row by row; entries that do not
//! parse stay undefined for that row only. Without a usable date column the
//! timestamps are synthesized as consecutive daily steps from 1960-01-01 in
//! source row order.

use chrono::{Days, NaiveDate};
use tracing::{info, warn};

use crate::domain::{ColumnRoles, ColumnValues, TabularFrame, TimeSeries};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

fn synthetic_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1960, 1, 1).unwrap_or_default()
}

/// One timestamp per frame row, `None` where a date entry failed to parse.
pub fn materialize(frame: &TabularFrame, roles: &ColumnRoles) -> Vec<Option<NaiveDate>> {
    let rows = frame.n_rows();

    if let Some(name) = &roles.date_column {
        if let Some(column) = frame.column(name) {
            let parsed: Vec<Option<NaiveDate>> = match &column.values {
                ColumnValues::Date(v) => v.clone(),
                ColumnValues::Text(v) => v
                    .iter()
                    .map(|s| s.as_deref().and_then(parse_date))
                    .collect(),
                ColumnValues::Float(_) => vec![None; rows],
            };
            if parsed.iter().any(Option::is_some) {
                return parsed;
            }
            warn!(
                column = %name,
                "no entry of the date column parsed as a date; synthesizing daily timestamps"
            );
        }
    } else {
        info!("no date column; synthesizing daily timestamps from 1960-01-01");
    }

    synthesize(rows)
}

fn synthesize(rows: usize) -> Vec<Option<NaiveDate>> {
    let start = synthetic_start();
    (0..rows)
        .map(|i| start.checked_add_days(Days::new(i as u64)))
        .collect()
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // Timestamps like "1961-01-01 12:00:00": take the date part.
    let (date_part, _) = s.split_once(' ')?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Pair timestamps with the cleaned values and filter to the inclusive
/// window. Rows with undefined timestamps are dropped from the output only;
/// the frame they came from is untouched. When the window leaves nothing,
/// every row with a defined timestamp is kept instead so the chart is never
/// empty for a merely mis-aimed window.
pub fn window(
    timestamps: &[Option<NaiveDate>],
    values: &[f64],
    start: NaiveDate,
    end: NaiveDate,
) -> TimeSeries {
    let dated: Vec<(NaiveDate, f64)> = timestamps
        .iter()
        .zip(values)
        .filter_map(|(ts, &v)| ts.map(|t| (t, v)))
        .collect();

    let in_window: Vec<(NaiveDate, f64)> = dated
        .iter()
        .copied()
        .filter(|&(t, _)| t >= start && t <= end)
        .collect();

    if in_window.is_empty() && !dated.is_empty() {
        warn!(%start, %end, "no rows inside the requested window; using the full series");
        return TimeSeries { points: dated };
    }
    TimeSeries { points: in_window }
}
