//! Export the cleaned frame to a delimited file.
//!
//! All source columns are written, in source order, with a header row. Float
//! cells use Rust's shortest round-trip formatting, so re-resolving the file
//! reproduces the value column exactly.

use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::domain::{ColumnValues, TabularFrame};
use crate::error::AppError;

pub fn write_frame_csv(path: &Path, frame: &TabularFrame) -> Result<(), AppError> {
    let map_io = |e: std::io::Error| {
        AppError::io(format!("failed to write export CSV '{}'", path.display()), e)
    };
    let map_csv = |e: csv::Error| {
        AppError::io(
            format!("failed to write export CSV '{}'", path.display()),
            std::io::Error::other(e),
        )
    };

    let file = File::create(path).map_err(map_io)?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(frame.column_names()).map_err(map_csv)?;
    for row in 0..frame.n_rows() {
        let record: Vec<String> = frame
            .columns()
            .iter()
            .map(|c| cell_text(&c.values, row))
            .collect();
        writer.write_record(&record).map_err(map_csv)?;
    }
    writer.flush().map_err(map_io)?;

    info!(path = %path.display(), rows = frame.n_rows(), "cleaned table written");
    Ok(())
}

fn cell_text(values: &ColumnValues, row: usize) -> String {
    match values {
        ColumnValues::Float(v) => v
            .get(row)
            .copied()
            .flatten()
            .map(|f| f.to_string())
            .unwrap_or_default(),
        ColumnValues::Text(v) => v.get(row).cloned().flatten().unwrap_or_default(),
        ColumnValues::Date(v) => v
            .get(row)
            .copied()
            .flatten()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, RawPayload};
    use crate::io::resolve::resolve;

    fn sample_frame() -> TabularFrame {
        TabularFrame::new(vec![
            Column {
                name: "fecha".into(),
                values: ColumnValues::Text(vec![
                    Some("1961-01-01".into()),
                    Some("1961-01-02".into()),
                    Some("1961-01-03".into()),
                ]),
            },
            Column {
                name: "caudal_m3s".into(),
                values: ColumnValues::Float(vec![Some(12.5), Some(13.25), None]),
            },
        ])
    }

    #[test]
    fn round_trip_preserves_value_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let frame = sample_frame();
        write_frame_csv(&path, &frame).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let reread = resolve(&RawPayload::new(bytes, None)).unwrap();

        assert_eq!(reread.column_names(), frame.column_names());
        assert_eq!(
            reread.column("caudal_m3s").unwrap().values,
            frame.column("caudal_m3s").unwrap().values
        );
    }

    #[test]
    fn text_cells_with_commas_survive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let frame = TabularFrame::new(vec![
            Column {
                name: "estacion".into(),
                values: ColumnValues::Text(vec![Some("Rio, Alto".into())]),
            },
            Column {
                name: "caudal".into(),
                values: ColumnValues::Float(vec![Some(1.0)]),
            },
        ]);
        write_frame_csv(&path, &frame).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let reread = resolve(&RawPayload::new(bytes, None)).unwrap();
        assert_eq!(
            reread.column("estacion").unwrap().values,
            frame.column("estacion").unwrap().values
        );
    }
}
