//! Formatted terminal output for a pipeline run.
//!
//! Formatting lives in one place so output changes stay localized; the
//! pipeline code only produces data.

use crate::clean::CleanSummary;
use crate::domain::{ColumnRoles, PipelineConfig};
use crate::report::SeriesStats;

/// The text lines of the chart's statistics box.
pub fn stats_box_lines(stats: &SeriesStats) -> Vec<String> {
    vec![
        format!("Records: {}", stats.count),
        format!("Min: {:.2} m³/s", stats.min),
        format!("Max: {:.2} m³/s", stats.max),
        format!("Mean: {:.2} m³/s", stats.mean),
        format!("Median: {:.2} m³/s", stats.median),
    ]
}

/// Full run summary printed to stdout after a successful run.
pub fn format_run_summary(
    config: &PipelineConfig,
    roles: &ColumnRoles,
    summary: &CleanSummary,
    stats: Option<&SeriesStats>,
    year_range: Option<(i32, i32)>,
) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== caudal - {} ({}) ===\n",
        config.station_name, config.station_id
    ));
    out.push_str(&format!("Window: {} to {}\n", config.start, config.end));
    out.push_str(&format!(
        "Columns: date={} value={}\n",
        roles.date_column.as_deref().unwrap_or("<synthesized>"),
        roles.value_column
    ));
    out.push_str(&format!(
        "Rows: in={} missing={} ({:.2}%) interpolated={} edge-filled={} dropped={}\n",
        summary.rows_in,
        summary.missing,
        summary.missing_fraction * 100.0,
        summary.interpolated,
        summary.edge_filled,
        summary.rows_dropped,
    ));

    match (stats, year_range) {
        (Some(stats), Some((y0, y1))) => {
            out.push_str(&format!("Plotted: n={} years={y0}-{y1}\n", stats.count));
            out.push_str(&format!(
                "Stats: min={:.2} max={:.2} mean={:.2} median={:.2} m³/s\n",
                stats.min, stats.max, stats.mean, stats.median
            ));
        }
        _ => out.push_str("Plotted: n=0\n"),
    }

    out.push_str("\nOutputs:\n");
    out.push_str(&format!("- {}\n", config.out_csv.display()));
    out.push_str(&format!("- {}\n", config.out_plot.display()));

    out
}
