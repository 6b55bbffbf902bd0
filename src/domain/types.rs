//! Shared domain types.
//!
//! These types are intentionally lightweight: the whole pipeline is a single
//! pass, so everything here is either a plain value object or a frame that
//! one stage hands to the next.

use std::path::PathBuf;

use chrono::NaiveDate;

/// Raw bytes fetched from the remote service, plus the content type the
/// server *declared*. The resolver treats the declaration as untrustworthy
/// and sniffs the bytes instead; the hint is kept for logging only.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl RawPayload {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
        }
    }
}

/// A typed column of a [`TabularFrame`]. `None` entries are missing values.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
            ColumnValues::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retain_rows(&mut self, keep: &[bool]) {
        match self {
            ColumnValues::Float(v) => retain_by_mask(v, keep),
            ColumnValues::Text(v) => retain_by_mask(v, keep),
            ColumnValues::Date(v) => retain_by_mask(v, keep),
        }
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut idx = 0;
    values.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn is_numeric(&self) -> bool {
        matches!(self.values, ColumnValues::Float(_))
    }

    pub fn is_date(&self) -> bool {
        matches!(self.values, ColumnValues::Date(_))
    }
}

/// An ordered set of equally-long named columns.
///
/// Invariants (upheld by the resolver, relied on everywhere):
/// - every column has the same row count
/// - names are unique case-insensitively
#[derive(Debug, Clone, PartialEq)]
pub struct TabularFrame {
    columns: Vec<Column>,
}

impl TabularFrame {
    pub fn new(columns: Vec<Column>) -> Self {
        debug_assert!(
            columns.windows(2).all(|w| w[0].values.len() == w[1].values.len()),
            "all columns must share a row count"
        );
        Self { columns }
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Drop every row whose mask entry is `false`. Survivor order is
    /// unchanged. `keep` must have one entry per row.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.n_rows());
        for column in &mut self.columns {
            column.values.retain_rows(keep);
        }
    }
}

/// The resolved roles: which column carries dates (if any) and which carries
/// the streamflow values. Recomputed once per run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    pub date_column: Option<String>,
    pub value_column: String,
}

/// The canonical cleaned output: one `(timestamp, value)` pair per surviving
/// row, in source row order. No missing values remain.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub points: Vec<(NaiveDate, f64)>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|&(d, _)| d)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(_, v)| v)
    }
}

/// Everything one pipeline run needs, resolved from the CLI.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub station_id: String,
    pub station_name: String,
    /// Requested window, inclusive on both ends.
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Caller-supplied column overrides; skip the heuristics when set.
    pub date_column: Option<String>,
    pub value_column: Option<String>,
    pub out_csv: PathBuf,
    pub out_plot: PathBuf,
    /// Where to keep a copy of the raw download for offline re-runs.
    pub raw_cache: Option<PathBuf>,
    pub plot_width: u32,
    pub plot_height: u32,
}
