//! The acquisition-and-normalization pipeline shared by the network and
//! offline entry points:
//!
//! fetch -> resolve -> identify -> clean -> timestamps/window
//!
//! Strictly sequential; every stage consumes the artifact of the previous
//! one and the first error ends the run.

use tracing::info;

use crate::clean::{self, CleanSummary};
use crate::data::ExploradorClient;
use crate::domain::{ColumnRoles, PipelineConfig, RawPayload, TabularFrame, TimeSeries};
use crate::error::AppError;
use crate::report::{self, SeriesStats};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The cleaned frame (all source columns, value gaps resolved).
    pub frame: TabularFrame,
    pub roles: ColumnRoles,
    pub summary: CleanSummary,
    /// The windowed canonical series fed to the chart.
    pub series: TimeSeries,
    pub stats: Option<SeriesStats>,
    pub year_range: Option<(i32, i32)>,
}

/// Fetch from the network, cache the raw bytes, then run the later stages.
pub fn run(config: &PipelineConfig) -> Result<RunOutput, AppError> {
    // 1) Fetch.
    let client = ExploradorClient::new()?;
    let payload = client.fetch(&config.station_id, config.start, config.end)?;

    if let Some(path) = &config.raw_cache {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::io(format!("failed to create '{}'", parent.display()), e)
            })?;
        }
        std::fs::write(path, &payload.bytes)
            .map_err(|e| AppError::io(format!("failed to cache '{}'", path.display()), e))?;
        info!(path = %path.display(), "raw payload cached");
    }

    run_from_payload(config, &payload)
}

/// Run stages 2..4 on an already-acquired payload.
pub fn run_from_payload(
    config: &PipelineConfig,
    payload: &RawPayload,
) -> Result<RunOutput, AppError> {
    // 2) Resolve the payload shape into a frame.
    let mut frame = crate::io::resolve(payload)?;
    info!(
        rows = frame.n_rows(),
        columns = ?frame.column_names(),
        "payload resolved"
    );

    // 3) Identify the date and value columns.
    let roles = clean::identify(
        &frame,
        config.date_column.as_deref(),
        config.value_column.as_deref(),
    )?;

    // 4) Repair missing values, then materialize timestamps off the cleaned
    //    frame and window the series.
    let summary = clean::clean(&mut frame, &roles);
    let timestamps = clean::materialize(&frame, &roles);
    let values = clean::cleaned_values(&frame, &roles);
    let series = clean::window(&timestamps, &values, config.start, config.end);

    let stats = report::series_stats(&series);
    let year_range = report::year_range(&series);

    Ok(RunOutput {
        frame,
        roles,
        summary,
        series,
        stats,
        year_range,
    })
}
