//! PNG time-series chart.
//!
//! The chart is data-driven: the caller computes the series, title, and the
//! stats-box lines; this module only draws. Bounds are validated up front so
//! Plotters never sees a degenerate coordinate range.

use std::path::Path;

use chrono::{Days, NaiveDate};
use plotters::prelude::*;

use crate::domain::TimeSeries;
use crate::error::AppError;

/// steelblue, on white.
const LINE_COLOR: RGBColor = RGBColor(70, 130, 180);
/// wheat, for the stats box.
const BOX_FILL: RGBColor = RGBColor(245, 222, 179);
const GRID_COLOR: RGBColor = RGBColor(235, 235, 235);

/// Render-only chart description.
pub struct StreamflowChart<'a> {
    pub series: &'a TimeSeries,
    pub title: String,
    pub stats_lines: Vec<String>,
    pub width: u32,
    pub height: u32,
}

pub fn render_png(desc: &StreamflowChart, path: &Path) -> Result<(), AppError> {
    draw(desc, path).map_err(|e| AppError::Chart(e.to_string()))
}

fn draw(desc: &StreamflowChart, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (x0, x1, y_max) = bounds(desc.series).ok_or("no rows to plot")?;

    let root = BitMapBackend::new(path, (desc.width, desc.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(16)
        .caption(&desc.title, ("sans-serif", 28))
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x0..x1, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Streamflow (m³/s)")
        .x_labels(12)
        .y_labels(8)
        .light_line_style(&GRID_COLOR)
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y").to_string())
        .label_style(("sans-serif", 15))
        .axis_desc_style(("sans-serif", 17))
        .draw()?;

    chart.draw_series(LineSeries::new(
        desc.series.points.iter().copied(),
        LINE_COLOR.stroke_width(1),
    ))?;

    if !desc.stats_lines.is_empty() {
        draw_stats_box(&root, &desc.stats_lines)?;
    }

    root.present()?;
    Ok(())
}

/// X bounds and a padded Y maximum. `None` when there is nothing to plot.
fn bounds(series: &TimeSeries) -> Option<(NaiveDate, NaiveDate, f64)> {
    let x0 = series.timestamps().min()?;
    let mut x1 = series.timestamps().max()?;
    if x0 == x1 {
        // A single observation still needs a non-empty x range.
        x1 = x1.checked_add_days(Days::new(1)).unwrap_or(x1);
    }

    let v_max = series.values().fold(f64::NEG_INFINITY, f64::max);
    let y_max = if v_max.is_finite() && v_max > 0.0 {
        v_max * 1.05
    } else {
        1.0
    };
    Some((x0, x1, y_max))
}

fn draw_stats_box(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    lines: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    const LINE_HEIGHT: i32 = 20;
    const PADDING: i32 = 8;

    let origin = (90, 60);
    let longest = lines.iter().map(String::len).max().unwrap_or(0) as i32;
    let width = longest * 8 + 2 * PADDING;
    let height = lines.len() as i32 * LINE_HEIGHT + 2 * PADDING;

    root.draw(&Rectangle::new(
        [origin, (origin.0 + width, origin.1 + height)],
        BOX_FILL.mix(0.85).filled(),
    ))?;
    root.draw(&Rectangle::new(
        [origin, (origin.0 + width, origin.1 + height)],
        BLACK.mix(0.4),
    ))?;

    for (i, line) in lines.iter().enumerate() {
        root.draw(&Text::new(
            line.clone(),
            (origin.0 + PADDING, origin.1 + PADDING + i as i32 * LINE_HEIGHT),
            ("sans-serif", 15).into_font().color(&BLACK),
        ))?;
    }
    Ok(())
}
