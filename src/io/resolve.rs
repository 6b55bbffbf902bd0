//! Payload format resolution.
//!
//! Turns the raw download into a [`TabularFrame`]. The content type the
//! server declared is ignored; the leading bytes decide:
//!
//! - ZIP/OLE2 magic -> spreadsheet, parsed with calamine (first worksheet)
//! - `{` / `[`      -> JSON; never tabular data at this point, rejected
//! - anything else  -> delimited text: UTF-8 with a Latin-1 fallback, then
//!   comma, tab, and whitespace separators tried in that order
//!
//! Column names keep their original header text (deduplicated when a header
//! repeats); per-column types are inferred, never declared.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::domain::{Column, ColumnValues, RawPayload, TabularFrame};
use crate::error::FormatError;

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Resolve a raw payload into a tabular frame.
pub fn resolve(payload: &RawPayload) -> Result<TabularFrame, FormatError> {
    if let Some(hint) = &payload.content_type {
        debug!(declared = %hint, "resolving payload (declared type ignored)");
    }

    if is_spreadsheet(&payload.bytes) {
        return resolve_spreadsheet(&payload.bytes);
    }
    if is_json(&payload.bytes) {
        return Err(FormatError::UnexpectedEnvelope);
    }
    resolve_delimited(&payload.bytes)
}

fn is_spreadsheet(bytes: &[u8]) -> bool {
    bytes.starts_with(&ZIP_MAGIC) || bytes.starts_with(&OLE2_MAGIC)
}

fn is_json(bytes: &[u8]) -> bool {
    matches!(
        bytes.iter().copied().find(|b| !b.is_ascii_whitespace()),
        Some(b'{') | Some(b'[')
    )
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

/// Header row + string cells, before any type inference.
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn resolve_delimited(bytes: &[u8]) -> Result<TabularFrame, FormatError> {
    let (text, encoding) = decode_text(bytes);
    let text = strip_bom(&text);
    debug!(encoding, "decoded payload text");

    // A wrong separator usually still "parses" into a single wide column, so
    // an attempt only wins outright when it yields at least two columns. A
    // single-column result is kept as a last resort.
    let attempts: [(&str, Option<u8>); 3] = [
        ("comma", Some(b',')),
        ("tab", Some(b'\t')),
        ("whitespace", None),
    ];

    let mut single_column: Option<(&str, RawTable)> = None;
    let mut failures: Vec<String> = Vec::new();

    for (name, delimiter) in attempts {
        let result = match delimiter {
            Some(d) => parse_with_csv(text, d),
            None => parse_whitespace(text),
        };
        match result {
            Ok(table) if table.headers.len() >= 2 => {
                debug!(
                    separator = name,
                    columns = table.headers.len(),
                    rows = table.rows.len(),
                    "delimited parse accepted"
                );
                return Ok(build_frame(table));
            }
            Ok(table) => {
                if single_column.is_none() {
                    single_column = Some((name, table));
                }
            }
            Err(err) => failures.push(format!("{name}: {err}")),
        }
    }

    if let Some((name, table)) = single_column {
        warn!(separator = name, "payload parsed as a single column");
        return Ok(build_frame(table));
    }

    Err(FormatError::Unparseable {
        detail: failures.join("; "),
    })
}

fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), "utf-8"),
        // Latin-1 maps every byte to the code point of the same value, so
        // this decode cannot fail.
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), "latin-1"),
    }
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

fn parse_with_csv(text: &str, delimiter: u8) -> Result<RawTable, String> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err("no header row".to_string());
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable { headers, rows })
}

fn parse_whitespace(text: &str) -> Result<RawTable, String> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let headers: Vec<String> = lines
        .next()
        .ok_or_else(|| "empty payload".to_string())?
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if fields.len() != headers.len() {
            return Err(format!(
                "line {}: expected {} fields, found {}",
                idx + 2,
                headers.len(),
                fields.len()
            ));
        }
        rows.push(fields);
    }
    Ok(RawTable { headers, rows })
}

fn build_frame(table: RawTable) -> TabularFrame {
    let names = dedupe_names(
        table
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| clean_header(h, i))
            .collect(),
    );

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(col, name)| {
            let cells: Vec<&str> = table.rows.iter().map(|row| row[col].as_str()).collect();
            infer_column(name, &cells)
        })
        .collect();

    TabularFrame::new(columns)
}

/// Numeric if every non-missing cell parses as a finite float.
fn infer_column(name: String, cells: &[&str]) -> Column {
    let mut floats: Vec<Option<f64>> = Vec::with_capacity(cells.len());
    let mut numeric = true;
    for cell in cells {
        if is_missing(cell) {
            floats.push(None);
        } else if let Some(v) = parse_f64(cell) {
            floats.push(Some(v));
        } else {
            numeric = false;
            break;
        }
    }

    if numeric {
        return Column {
            name,
            values: ColumnValues::Float(floats),
        };
    }

    let texts = cells
        .iter()
        .map(|cell| {
            let t = cell.trim();
            if t.is_empty() { None } else { Some(t.to_string()) }
        })
        .collect();
    Column {
        name,
        values: ColumnValues::Text(texts),
    }
}

fn is_missing(cell: &str) -> bool {
    let t = cell.trim();
    t.is_empty() || t.eq_ignore_ascii_case("nan") || t.eq_ignore_ascii_case("na")
}

fn parse_f64(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn clean_header(header: &str, index: usize) -> String {
    // Excel and other tools sometimes emit a BOM glued to the first header.
    let name = header.trim().trim_start_matches('\u{feff}').trim();
    if name.is_empty() {
        format!("column_{}", index + 1)
    } else {
        name.to_string()
    }
}

/// Make names unique case-insensitively by suffixing repeats with `_2`, `_3`, ...
fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 1usize;
        while seen.iter().any(|s| s.eq_ignore_ascii_case(&candidate)) {
            n += 1;
            candidate = format!("{name}_{n}");
        }
        seen.push(candidate.to_ascii_lowercase());
        out.push(candidate);
    }
    out
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

fn resolve_spreadsheet(bytes: &[u8]) -> Result<TabularFrame, FormatError> {
    let spreadsheet_err = |e: calamine::Error| FormatError::Unparseable {
        detail: format!("spreadsheet: {e}"),
    };

    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(spreadsheet_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FormatError::Unparseable {
            detail: "spreadsheet has no worksheets".to_string(),
        })?
        .map_err(spreadsheet_err)?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| FormatError::Unparseable {
            detail: "spreadsheet worksheet is empty".to_string(),
        })?
        .iter()
        .enumerate()
        .map(|(i, cell)| header_from_cell(cell, i))
        .collect();
    let data: Vec<&[Data]> = rows.collect();

    let names = dedupe_names(headers);
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(col, name)| {
            let cells: Vec<Data> = data
                .iter()
                .map(|row| row.get(col).cloned().unwrap_or(Data::Empty))
                .collect();
            sheet_column(name, &cells)
        })
        .collect();

    Ok(TabularFrame::new(columns))
}

fn header_from_cell(cell: &Data, index: usize) -> String {
    match cell {
        Data::String(s) => clean_header(s, index),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        _ => format!("column_{}", index + 1),
    }
}

fn sheet_column(name: String, cells: &[Data]) -> Column {
    let has_dates = cells
        .iter()
        .any(|c| matches!(c, Data::DateTime(_) | Data::DateTimeIso(_)));
    if has_dates {
        let dates = cells.iter().map(|c| sheet_date(c)).collect();
        return Column {
            name,
            values: ColumnValues::Date(dates),
        };
    }

    let numeric = cells.iter().all(|c| match c {
        Data::Empty => true,
        Data::Float(f) => f.is_finite(),
        Data::Int(_) => true,
        Data::String(s) => is_missing(s) || parse_f64(s).is_some(),
        _ => false,
    });
    if numeric {
        let floats = cells
            .iter()
            .map(|c| match c {
                Data::Float(f) if f.is_finite() => Some(*f),
                Data::Int(i) => Some(*i as f64),
                Data::String(s) => parse_f64(s),
                _ => None,
            })
            .collect();
        return Column {
            name,
            values: ColumnValues::Float(floats),
        };
    }

    let texts = cells
        .iter()
        .map(|c| match c {
            Data::Empty => None,
            Data::String(s) => {
                let t = s.trim();
                if t.is_empty() { None } else { Some(t.to_string()) }
            }
            other => Some(other.to_string()),
        })
        .collect();
    Column {
        name,
        values: ColumnValues::Text(texts),
    }
}

fn sheet_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime().map(|ndt| ndt.date()),
        Data::DateTimeIso(s) => NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok(),
        _ => None,
    }
}
